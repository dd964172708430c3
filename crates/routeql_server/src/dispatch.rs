//! The GraphQL endpoint handler.
//!
//! One request goes through: method gate, source extraction, variable
//! decoding, parse, validation, execution and error formatting. Anything
//! detected before execution rejects the whole request with a 400; field
//! errors are returned with a 200 next to the data.

use crate::config::ErrorFormatter;
use crate::registry::SchemaRegistry;
use async_trait::async_trait;
use http::{Method, StatusCode};
use routeql_router::{Handler, RouteError, RouteRequest, RouteResponse};
use routeql_runtime::{Execution, FieldTimings, GraphqlRequest, RequestContext};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, field, info_span, Instrument, Span};

/// Answers GraphQL requests against the registry's active schema.
pub struct Dispatcher {
    registry: Arc<SchemaRegistry>,
    format_error: Option<ErrorFormatter>,
    tracing: bool,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        format_error: Option<ErrorFormatter>,
        tracing: bool,
    ) -> Self {
        Self {
            registry,
            format_error,
            tracing,
        }
    }

    async fn run(&self, request: RouteRequest) -> Result<RouteResponse, RouteError> {
        let source = extract_source(&request);
        let query = source.get("query").and_then(Value::as_str).map(str::to_string);
        let variables = decode_variables(source.get("variables")).map_err(|err| {
            Span::current().record("error", err.message.as_str());
            err
        })?;
        let query = query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| RouteError::bad_request("Missing query"))?;
        let operation_name = source
            .get("operationName")
            .and_then(Value::as_str)
            .map(str::to_string);

        let schema = self
            .registry
            .current()
            .ok_or_else(|| RouteError::internal("no schema registered"))?;

        let timings = self.tracing.then(|| Arc::new(FieldTimings::new()));
        let ctx = request_context(&request, timings.clone());
        let graphql_request = GraphqlRequest {
            query,
            variables,
            operation_name,
        };

        let mut response = match schema.execute(graphql_request, ctx).await {
            Execution::Rejected(rejection) => {
                let message = rejection.message();
                Span::current().record("error", message.as_str());
                return Err(RouteError::bad_request(message));
            }
            Execution::Completed(response) => response,
        };

        if let Some(format_error) = &self.format_error {
            response.errors = response.errors.into_iter().map(|e| format_error(e)).collect();
        }
        let body = serde_json::to_value(&response)
            .map_err(|e| RouteError::internal(format!("Failed to serialize response: {e}")))?;
        if !response.errors.is_empty() {
            error!(result = %body, "graphql execution finished with errors");
        }
        if let Some(timings) = timings {
            tracing::debug!(
                fields = timings.len(),
                total_us = u64::try_from(timings.total().as_micros()).unwrap_or(u64::MAX),
                slowest = timings.slowest().map(|t| t.path).unwrap_or_default(),
                "field timings"
            );
        }
        Ok(RouteResponse::ok(body))
    }
}

#[async_trait]
impl Handler for Dispatcher {
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse, RouteError> {
        if request.method == Method::OPTIONS {
            return Ok(preflight());
        }
        if !self.tracing {
            return self.run(request).await;
        }
        let span = info_span!(
            "graphql.request",
            method = %request.method,
            path = %request.path,
            payload = field::Empty,
            error = field::Empty,
        );
        if let Some(payload) = &request.payload {
            span.record("payload", field::display(payload));
        }
        self.run(request).instrument(span).await
    }
}

fn preflight() -> RouteResponse {
    RouteResponse::empty(StatusCode::OK)
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .with_header("Access-Control-Allow-Headers", "Content-Type, Authorization")
}

fn extract_source(request: &RouteRequest) -> Map<String, Value> {
    if request.method == Method::GET {
        return request
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
    }
    match &request.payload {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

fn decode_variables(raw: Option<&Value>) -> Result<Option<Value>, RouteError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(value @ Value::Object(_)) => Ok(Some(value)),
            Ok(Value::Null) => Ok(None),
            _ => Err(RouteError::bad_request("unable to parse variables")),
        },
        Some(value @ Value::Object(_)) => Ok(Some(value.clone())),
        Some(_) => Err(RouteError::bad_request("unable to parse variables")),
    }
}

fn request_context(request: &RouteRequest, timings: Option<Arc<FieldTimings>>) -> RequestContext {
    let mut ctx = RequestContext::new()
        .with_method(request.method.as_str())
        .with_path(request.path.clone());
    for (name, value) in &request.headers {
        ctx.set_header(name, value.clone());
    }
    if let Some(credentials) = &request.credentials {
        ctx = ctx.with_credentials(credentials.clone());
    }
    if let Some(router) = request.router() {
        ctx.insert(Arc::clone(router));
    }
    if let Some(timings) = timings {
        ctx.insert(timings);
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_variables() {
        assert_eq!(decode_variables(None).unwrap(), None);
        assert_eq!(decode_variables(Some(&json!(""))).unwrap(), None);
        assert_eq!(
            decode_variables(Some(&json!(r#"{"a": 1}"#))).unwrap(),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            decode_variables(Some(&json!({"a": 1}))).unwrap(),
            Some(json!({"a": 1}))
        );

        let err = decode_variables(Some(&json!("invalid"))).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "unable to parse variables");
        assert!(decode_variables(Some(&json!(3))).is_err());
    }

    #[test]
    fn test_extract_source() {
        let get = RouteRequest::get("/graphql?query=%7Bhello%7D&operationName=Q");
        let source = extract_source(&get);
        assert_eq!(source["query"], "{hello}");
        assert_eq!(source["operationName"], "Q");

        let empty_post = RouteRequest::post("/graphql");
        assert!(extract_source(&empty_post).is_empty());

        let post = RouteRequest::post("/graphql").payload(json!({"query": "{ a }"}));
        assert_eq!(extract_source(&post)["query"], "{ a }");
    }

    #[test]
    fn test_request_context_copies_request() {
        let request = RouteRequest::post("/graphql").header("Cookie", "sid=1");
        let ctx = request_context(&request, Some(Arc::new(FieldTimings::new())));
        assert_eq!(ctx.method(), "POST");
        assert_eq!(ctx.path(), "/graphql");
        assert_eq!(ctx.header("cookie"), Some("sid=1"));
        assert!(ctx.get::<Arc<FieldTimings>>().is_some());
    }
}
