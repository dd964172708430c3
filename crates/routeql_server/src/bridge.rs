//! Exposes ordinary routes as GraphQL fields.
//!
//! A route takes part when its method is the internal-only `GRAPHQL` token
//! or when it carries the `graphql` tag. Each one becomes a top-level field
//! named after its path (realm prefix and leading `/` removed), resolved by
//! an internal call into the router with the route's own method, or with
//! `GRAPHQL` when the route accepts any method.

use http::{Method, StatusCode};
use routeql_router::{ResponseBody, RouteInfo, RouteRequest, RouteResponse, Router};
use routeql_runtime::{
    AuxContext, RequestContext, Resolver, ResolverArgs, ResolverError, ResolverFuture,
    ResolverInfo, ResolverMap,
};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Method token of routes that are only reachable through GraphQL.
pub const GRAPHQL_METHOD: &str = "GRAPHQL";

/// Tag opting a regular route into GraphQL.
pub const GRAPHQL_TAG: &str = "graphql";

static GRAPHQL: LazyLock<Method> = LazyLock::new(|| {
    Method::from_bytes(GRAPHQL_METHOD.as_bytes()).expect("GRAPHQL is a valid method token")
});

/// The `GRAPHQL` method.
pub fn graphql_method() -> Method {
    GRAPHQL.clone()
}

/// Returns true if the route is exposed as a GraphQL field.
pub fn participates(route: &RouteInfo) -> bool {
    route.method.exact() == Some(&*GRAPHQL) || route.has_tag(GRAPHQL_TAG)
}

/// Field name of a bridged route.
pub fn field_name(route: &RouteInfo) -> String {
    let local = route.local_path();
    local.strip_prefix('/').unwrap_or(local).to_string()
}

/// Builds bare top-level resolvers for every participating route.
pub fn bridge_resolvers(routes: &[RouteInfo], forward_headers: &[String]) -> ResolverMap {
    let forward_headers: Arc<[String]> = forward_headers.into();
    let mut resolvers = ResolverMap::new();
    for route in routes.iter().filter(|route| participates(route)) {
        // ANY routes are called with GRAPHQL, which they also match
        let method = route.method.exact().cloned().unwrap_or_else(graphql_method);
        let field = field_name(route);
        debug!(%field, %method, path = %route.path, "bridging route");
        resolvers.register_root(
            field.clone(),
            BridgeResolver {
                method,
                url: format!("{}/{field}", route.prefix.trim_end_matches('/')),
                forward_headers: Arc::clone(&forward_headers),
            },
        );
    }
    resolvers
}

/// Resolves a field by calling a route in-process.
pub struct BridgeResolver {
    method: Method,
    url: String,
    forward_headers: Arc<[String]>,
}

impl BridgeResolver {
    fn request(&self, args: &ResolverArgs, ctx: &RequestContext) -> RouteRequest {
        let mut request = RouteRequest::new(self.method.clone(), &self.url).payload(args.to_json());
        if self.method == Method::GET {
            for (name, value) in args.all() {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                request = request.query_param(name.clone(), value);
            }
        }
        for name in self.forward_headers.iter() {
            if let Some(value) = ctx.header(name) {
                request = request.header(name, value);
            }
        }
        request
    }
}

impl Resolver for BridgeResolver {
    fn resolve<'a>(
        &'a self,
        _aux: &'a AuxContext,
        _parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a RequestContext,
        _info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        Box::pin(async move {
            let router = ctx.get::<Arc<Router>>().ok_or_else(|| {
                ResolverError::Internal(format!("No router available to call {}", self.url))
            })?;
            let response = router.inject(self.request(args, ctx)).await;
            field_value(response)
        })
    }
}

fn field_value(response: RouteResponse) -> Result<Value, ResolverError> {
    if response.status.as_u16() < 400 {
        return Ok(match response.body {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Html(html) => Value::String(html),
        });
    }

    let reason = response.status.canonical_reason().unwrap_or("Unknown");
    let body = response.json_body();
    let text = |key: &str| {
        body.and_then(|body| body.get(key))
            .and_then(Value::as_str)
            .map(ToString::to_string)
    };
    let status = response.status;
    let error = text("error").unwrap_or_else(|| reason.to_string());
    let message = text("message").unwrap_or_else(|| default_message(status));
    match status {
        StatusCode::UNAUTHORIZED => Err(ResolverError::Unauthorized(message)),
        _ => Err(ResolverError::Http {
            status: status.as_u16(),
            error,
            message,
        }),
    }
}

fn default_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routeql_router::{Route, RouteError, RouteMethod};
    use serde_json::json;

    fn info(method: RouteMethod, path: &str, prefix: &str, tags: &[&str]) -> RouteInfo {
        RouteInfo {
            method,
            path: routeql_router::join_path(prefix, path),
            prefix: prefix.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
            auth: None,
        }
    }

    #[test]
    fn test_participation_and_field_names() {
        let tagged = info(Method::POST.into(), "/createPerson", "", &["graphql"]);
        let prefixed = info(Method::POST.into(), "/createPerson", "/test", &["graphql"]);
        let token = info(graphql_method().into(), "/person", "", &[]);
        let plain = info(Method::GET.into(), "/health", "", &[]);

        assert!(participates(&tagged) && participates(&prefixed) && participates(&token));
        assert!(!participates(&plain));
        assert_eq!(field_name(&tagged), "createPerson");
        assert_eq!(field_name(&prefixed), "createPerson");
        assert_eq!(field_name(&token), "person");
    }

    #[test]
    fn test_bridge_resolvers_use_route_method() {
        let routes = vec![
            info(graphql_method().into(), "/person", "", &[]),
            info(Method::GET.into(), "/people", "/api", &["graphql"]),
            info(RouteMethod::Any, "/anything", "", &["graphql"]),
        ];
        let resolvers = bridge_resolvers(&routes, &["authorization".to_string()]);
        assert_eq!(resolvers.len(), 3);

        let people = BridgeResolver {
            method: Method::GET,
            url: "/api/people".into(),
            forward_headers: vec!["authorization".to_string()].into(),
        };
        let mut args = ResolverArgs::new();
        args.set("limit", json!(2));
        let ctx = RequestContext::new()
            .with_header("Authorization", "Bearer x")
            .with_header("X-Other", "no");
        let request = people.request(&args, &ctx);
        assert_eq!(request.path, "/api/people");
        assert_eq!(request.query["limit"], "2");
        assert_eq!(request.payload, Some(json!({"limit": 2})));
        assert_eq!(request.header_value("authorization"), Some("Bearer x"));
        assert!(request.header_value("x-other").is_none());
    }

    #[test]
    fn test_field_value_mapping() {
        assert_eq!(field_value(RouteResponse::ok(json!({"a": 1}))).unwrap(), json!({"a": 1}));

        let not_found = field_value(RouteResponse::from(RouteError::new(
            StatusCode::NOT_FOUND,
            "no such person",
        )))
        .unwrap_err();
        assert!(matches!(
            not_found,
            ResolverError::Http { status: 404, ref error, ref message }
                if error == "Not Found" && message == "no such person"
        ));

        let unauthorized = field_value(RouteResponse::from(RouteError::unauthorized(
            "Missing authentication",
        )))
        .unwrap_err();
        assert_eq!(unauthorized.to_string(), "Missing authentication");
    }

    #[tokio::test]
    async fn test_resolver_calls_route() {
        let mut router = Router::new();
        router
            .reserve_internal_method(graphql_method())
            .route(Route::new(graphql_method(), "/person", |req: RouteRequest| async move {
                let name = req.payload.as_ref().and_then(|p| p["name"].as_str()).unwrap_or("?");
                Ok::<_, RouteError>(RouteResponse::ok(json!({"name": name})))
            }));
        let router = router.start().unwrap();

        let resolver = BridgeResolver {
            method: graphql_method(),
            url: "/person".into(),
            forward_headers: Vec::new().into(),
        };
        let mut args = ResolverArgs::new();
        args.set("name", json!("Ann"));
        let ctx = RequestContext::new().with(Arc::clone(&router));
        let value = resolver
            .resolve(
                &AuxContext::new(),
                &Value::Null,
                &args,
                &ctx,
                &ResolverInfo::new("person", "Query"),
            )
            .await
            .unwrap();
        assert_eq!(value, json!({"name": "Ann"}));
    }
}
