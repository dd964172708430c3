//! Route definitions.

use crate::error::RouteError;
use crate::request::{RouteRequest, RouteResponse};
use async_trait::async_trait;
use http::Method;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Method a route answers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Any method.
    Any,
    /// One method. Extension methods such as `GRAPHQL` are allowed.
    Exact(Method),
}

impl RouteMethod {
    /// Parses a method token. `*` and `ANY` mean any method.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "*" | "ANY" => Some(Self::Any),
            other => Method::from_bytes(other.as_bytes()).ok().map(Self::Exact),
        }
    }

    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(own) => own == method,
        }
    }

    /// The exact method, if any.
    pub fn exact(&self) -> Option<&Method> {
        match self {
            Self::Any => None,
            Self::Exact(method) => Some(method),
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(method) => write!(f, "{method}"),
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        Self::Exact(method)
    }
}

/// Request handler of a route.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse, RouteError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(RouteRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RouteResponse, RouteError>> + Send,
{
    async fn call(&self, request: RouteRequest) -> Result<RouteResponse, RouteError> {
        self(request).await
    }
}

/// A shared handler.
pub type SharedHandler = Arc<dyn Handler>;

/// Handler-free description of a registered route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: RouteMethod,
    /// Full path, realm prefix included.
    pub path: String,
    /// Realm prefix, empty outside any realm.
    pub prefix: String,
    pub tags: Vec<String>,
    /// Name of the auth strategy guarding the route.
    pub auth: Option<String>,
}

impl RouteInfo {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Path with the realm prefix removed.
    pub fn local_path(&self) -> &str {
        self.path.strip_prefix(&self.prefix).unwrap_or(&self.path)
    }
}

/// A route under construction.
#[derive(Clone)]
pub struct Route {
    pub(crate) method: RouteMethod,
    pub(crate) path: String,
    pub(crate) tags: Vec<String>,
    pub(crate) auth: Option<String>,
    pub(crate) handler: SharedHandler,
}

impl Route {
    pub fn new<H: Handler + 'static>(method: impl Into<RouteMethod>, path: &str, handler: H) -> Self {
        Self {
            method: method.into(),
            path: path.to_string(),
            tags: Vec::new(),
            auth: None,
            handler: Arc::new(handler),
        }
    }

    pub fn get<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::new(Method::GET, path, handler)
    }

    pub fn post<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::new(Method::POST, path, handler)
    }

    pub fn any<H: Handler + 'static>(path: &str, handler: H) -> Self {
        Self::new(RouteMethod::Any, path, handler)
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Guards the route with a named auth strategy.
    #[must_use]
    pub fn auth(mut self, strategy: impl Into<String>) -> Self {
        self.auth = Some(strategy.into());
        self
    }

    /// Guards the route with `strategy` when it is `Some`.
    #[must_use]
    pub fn auth_opt(mut self, strategy: Option<String>) -> Self {
        self.auth = strategy;
        self
    }

    pub(crate) fn info(&self, prefix: &str) -> RouteInfo {
        RouteInfo {
            method: self.method.clone(),
            path: join_path(prefix, &self.path),
            prefix: prefix.to_string(),
            tags: self.tags.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("tags", &self.tags)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// Joins a realm prefix and a route path.
pub fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    match (prefix.is_empty(), path.starts_with('/')) {
        (true, _) => path.to_string(),
        (false, true) => format!("{prefix}{path}"),
        (false, false) => format!("{prefix}/{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_method_parse() {
        assert_eq!(RouteMethod::parse("*"), Some(RouteMethod::Any));
        let graphql = RouteMethod::parse("GRAPHQL").unwrap();
        assert!(graphql.matches(&Method::from_bytes(b"GRAPHQL").unwrap()));
        assert!(!graphql.matches(&Method::POST));
        assert_eq!(graphql.to_string(), "GRAPHQL");
    }

    #[test]
    fn test_join_and_local_path() {
        assert_eq!(join_path("", "/person"), "/person");
        assert_eq!(join_path("/test/", "/createPerson"), "/test/createPerson");

        let route = Route::post("/createPerson", |_req: RouteRequest| async {
            Ok::<_, RouteError>(RouteResponse::empty(http::StatusCode::NO_CONTENT))
        })
        .tag("graphql");
        let info = route.info("/test");
        assert_eq!(info.path, "/test/createPerson");
        assert_eq!(info.local_path(), "/createPerson");
        assert!(info.has_tag("graphql"));
    }
}
