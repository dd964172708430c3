//! Request and response values exchanged with route handlers.

use crate::error::RouteError;
use crate::route::RouteInfo;
use crate::router::Router;
use http::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A request routed to a handler.
///
/// Header names are lowercased. `payload` is the JSON body; it is `None` when
/// the body was empty.
#[derive(Clone)]
pub struct RouteRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub payload: Option<Value>,
    pub credentials: Option<Value>,
    pub(crate) internal: bool,
    pub(crate) route: Option<RouteInfo>,
    pub(crate) router: Option<Arc<Router>>,
}

impl RouteRequest {
    /// Creates a request. A query string in `target` is split off into
    /// [`RouteRequest::query`].
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: HashMap::new(),
            payload: None,
            credentials: None,
            internal: false,
            route: None,
            router: None,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Header value, case-insensitively.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for requests made through [`Router::inject`].
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// The matched route, set by the router before the handler runs.
    pub fn route(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    /// Handle to the router serving this request.
    pub fn router(&self) -> Option<&Arc<Router>> {
        self.router.as_ref()
    }

    /// Realm prefix of the matched route (empty outside any realm).
    pub fn prefix(&self) -> &str {
        self.route.as_ref().map_or("", |route| route.prefix.as_str())
    }
}

impl fmt::Debug for RouteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("payload", &self.payload)
            .field("internal", &self.internal)
            .finish_non_exhaustive()
    }
}

pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Body of a [`RouteResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Html(String),
}

/// A handler reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl RouteResponse {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: ResponseBody::Json(body),
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type".into(), "text/html; charset=utf-8".into())],
            body: ResponseBody::Html(body.into()),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: ResponseBody::Empty,
        }
    }

    #[must_use]
    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_ascii_lowercase(), value.into()));
        self
    }

    /// First header value under `key`, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// JSON body, if any.
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Body rendered as text.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Empty => String::new(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Html(html) => html.clone(),
        }
    }
}

impl From<RouteError> for RouteResponse {
    fn from(err: RouteError) -> Self {
        Self::json(err.status, err.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_split() {
        let request = RouteRequest::get("/graphql?query=%7B+hello+%7D&variables=invalid");
        assert_eq!(request.path, "/graphql");
        assert_eq!(request.query["query"], "{ hello }");
        assert_eq!(request.query["variables"], "invalid");
    }

    #[test]
    fn test_error_into_response() {
        let response = RouteResponse::from(RouteError::bad_request("nope"));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(
            response.json_body(),
            Some(&json!({"statusCode": 400, "error": "Bad Request", "message": "nope"}))
        );
    }
}
