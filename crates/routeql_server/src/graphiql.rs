//! GraphiQL page.

use async_trait::async_trait;
use routeql_router::{join_path, Handler, RouteError, RouteRequest, RouteResponse};
use serde_json::Value;

/// Serves the GraphiQL page for the endpoint at `graphql_path` in the same
/// realm.
pub struct GraphiqlPage {
    graphql_path: String,
}

impl GraphiqlPage {
    pub fn new(graphql_path: impl Into<String>) -> Self {
        Self {
            graphql_path: graphql_path.into(),
        }
    }
}

#[async_trait]
impl Handler for GraphiqlPage {
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse, RouteError> {
        let endpoint = join_path(request.prefix(), &self.graphql_path);
        let param = |name: &str| request.query.get(name).map(String::as_str);
        Ok(RouteResponse::html(render(
            &endpoint,
            param("query"),
            param("variables"),
            param("operationName"),
        )))
    }
}

/// Renders the page with the given values pre-populated.
pub fn render(
    endpoint: &str,
    query: Option<&str>,
    variables: Option<&str>,
    operation_name: Option<&str>,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>routeql GraphiQL</title>
    <meta charset="utf-8" />
    <style>body {{ height: 100vh; margin: 0; overflow: hidden; }} #graphiql {{ height: 100vh; }}</style>
    <link rel="stylesheet" href="https://unpkg.com/graphiql@3/graphiql.min.css" />
    <script crossorigin src="https://unpkg.com/react@18/umd/react.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/react-dom@18/umd/react-dom.production.min.js"></script>
    <script crossorigin src="https://unpkg.com/graphiql@3/graphiql.min.js"></script>
</head>
<body>
    <div id="graphiql">Loading...</div>
    <script>
        const endpoint = {endpoint};
        const fetcher = GraphiQL.createFetcher({{ url: endpoint }});
        ReactDOM.createRoot(document.getElementById('graphiql')).render(
            React.createElement(GraphiQL, {{
                fetcher,
                defaultQuery: {query},
                variables: {variables},
                operationName: {operation_name},
            }})
        );
    </script>
</body>
</html>"#,
        endpoint = script_literal(Some(endpoint)),
        query = script_literal(query),
        variables = script_literal(variables),
        operation_name = script_literal(operation_name),
    )
}

/// JSON literal safe to embed in a `<script>` block.
fn script_literal(value: Option<&str>) -> String {
    let json = value.map_or(Value::Null, |v| Value::String(v.to_string()));
    json.to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeql_router::{Route, Router};

    #[test]
    fn test_render_escapes_values() {
        let html = render("/graphql", Some("{ a }</script>"), None, Some("Q"));
        assert!(html.contains(r#"const endpoint = "/graphql";"#));
        assert!(html.contains(r#"defaultQuery: "{ a }\u003c/script\u003e""#));
        assert!(!html.contains("{ a }</script>"));
        assert!(html.contains("variables: null"));
        assert!(html.contains(r#"operationName: "Q""#));
    }

    #[tokio::test]
    async fn test_endpoint_uses_realm_prefix() {
        let mut router = Router::new();
        router
            .realm("/test")
            .route(Route::get("/graphiql", GraphiqlPage::new("/graphql")));
        let router = router.start().unwrap();

        let response = router
            .dispatch(RouteRequest::get("/test/graphiql?query=%7B%20hello%20%7D"))
            .await;
        let html = response.text();
        assert!(html.contains(r#"const endpoint = "/test/graphql";"#));
        assert!(html.contains(r#"defaultQuery: "{ hello }""#));
    }
}
