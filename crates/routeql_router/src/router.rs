//! Route table and request dispatch.
//!
//! Routes are registered on a mutable [`Router`], optionally inside a realm
//! that prefixes their paths. [`Router::start`] runs the pre-start hooks over
//! the final route table and freezes the router behind an `Arc`; from then on
//! requests are answered with [`Router::dispatch`] (network) or
//! [`Router::inject`] (in-process).

use crate::auth::AuthStrategy;
use crate::error::{RouteError, RouterError};
use crate::request::{RouteRequest, RouteResponse};
use crate::route::{Route, RouteInfo, RouteMethod, SharedHandler};
use http::Method;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hook run once by [`Router::start`] with the final route table.
pub type PreStartHook = Box<dyn FnOnce(&[RouteInfo]) -> Result<(), RouterError> + Send + Sync>;

struct RegisteredRoute {
    info: RouteInfo,
    handler: SharedHandler,
}

/// Route table.
#[derive(Default)]
pub struct Router {
    routes: Vec<RegisteredRoute>,
    strategies: HashMap<String, Arc<dyn AuthStrategy>>,
    internal_methods: HashSet<Method>,
    pre_start: Vec<PreStartHook>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route outside any realm.
    pub fn route(&mut self, route: Route) -> &mut Self {
        self.add(route, "");
        self
    }

    /// Opens a realm whose routes are mounted under `prefix`.
    pub fn realm(&mut self, prefix: impl Into<String>) -> Realm<'_> {
        Realm {
            router: self,
            prefix: prefix.into(),
        }
    }

    /// Registers a named auth strategy.
    pub fn auth_strategy(
        &mut self,
        name: impl Into<String>,
        strategy: impl AuthStrategy + 'static,
    ) -> &mut Self {
        self.strategies.insert(name.into(), Arc::new(strategy));
        self
    }

    /// Marks `method` as internal-only: network requests using it get 404,
    /// while [`Router::inject`] still reaches its routes.
    pub fn reserve_internal_method(&mut self, method: Method) -> &mut Self {
        self.internal_methods.insert(method);
        self
    }

    /// Adds a hook run by [`Router::start`].
    pub fn on_pre_start<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&[RouteInfo]) -> Result<(), RouterError> + Send + Sync + 'static,
    {
        self.pre_start.push(Box::new(hook));
        self
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteInfo> {
        self.routes.iter().map(|route| &route.info)
    }

    /// Validates the route table, runs the pre-start hooks and freezes the
    /// router.
    pub fn start(mut self) -> Result<Arc<Self>, RouterError> {
        let mut seen = HashSet::new();
        for route in &self.routes {
            let info = &route.info;
            if !seen.insert((info.method.clone(), info.path.clone())) {
                return Err(RouterError::DuplicateRoute {
                    method: info.method.to_string(),
                    path: info.path.clone(),
                });
            }
            if let Some(strategy) = &info.auth {
                if !self.strategies.contains_key(strategy) {
                    return Err(RouterError::UnknownStrategy {
                        method: info.method.to_string(),
                        path: info.path.clone(),
                        strategy: strategy.clone(),
                    });
                }
            }
        }

        let table: Vec<RouteInfo> = self.routes().cloned().collect();
        for hook in std::mem::take(&mut self.pre_start) {
            hook(&table)?;
        }
        debug!(routes = table.len(), "router started");
        Ok(Arc::new(self))
    }

    /// Answers a request that arrived from the network.
    pub async fn dispatch(self: &Arc<Self>, mut request: RouteRequest) -> RouteResponse {
        request.internal = false;
        self.handle(request).await
    }

    /// Answers an in-process request. Internal-only methods are allowed.
    pub async fn inject(self: &Arc<Self>, mut request: RouteRequest) -> RouteResponse {
        request.internal = true;
        self.handle(request).await
    }

    async fn handle(self: &Arc<Self>, mut request: RouteRequest) -> RouteResponse {
        if !request.internal && self.internal_methods.contains(&request.method) {
            debug!(method = %request.method, path = %request.path, "internal-only method from network");
            return RouteError::not_found().into();
        }
        let Some(route) = self.lookup(&request.method, &request.path) else {
            debug!(method = %request.method, path = %request.path, "no route");
            return RouteError::not_found().into();
        };

        if let Some(name) = &route.info.auth {
            let Some(strategy) = self.strategies.get(name) else {
                warn!(strategy = %name, "auth strategy disappeared");
                return RouteError::internal("Unknown auth strategy").into();
            };
            match strategy.authenticate(&request).await {
                Ok(credentials) => request.credentials = Some(credentials),
                Err(err) => return err.into(),
            }
        }

        request.route = Some(route.info.clone());
        request.router = Some(Arc::clone(self));
        let response = match route.handler.call(request).await {
            Ok(response) => response,
            Err(err) => err.into(),
        };
        debug!(route = %route.info.path, status = %response.status, "handled");
        response
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<&RegisteredRoute> {
        let on_path = || self.routes.iter().filter(move |r| r.info.path == path);
        on_path()
            .find(|r| r.info.method.exact() == Some(method))
            .or_else(|| on_path().find(|r| r.info.method == RouteMethod::Any))
    }

    fn add(&mut self, route: Route, prefix: &str) {
        self.routes.push(RegisteredRoute {
            info: route.info(prefix),
            handler: route.handler,
        });
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self
                    .routes()
                    .map(|r| format!("{} {}", r.method, r.path))
                    .collect::<Vec<_>>(),
            )
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .field("internal_methods", &self.internal_methods)
            .finish_non_exhaustive()
    }
}

/// Routes mounted under a common prefix.
pub struct Realm<'a> {
    router: &'a mut Router,
    prefix: String,
}

impl Realm<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn route(&mut self, route: Route) -> &mut Self {
        let prefix = self.prefix.clone();
        self.router.add(route, &prefix);
        self
    }

    pub fn reserve_internal_method(&mut self, method: Method) -> &mut Self {
        self.router.reserve_internal_method(method);
        self
    }

    pub fn on_pre_start<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&[RouteInfo]) -> Result<(), RouterError> + Send + Sync + 'static,
    {
        self.router.on_pre_start(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerTokens;
    use http::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    fn echo(label: &'static str) -> impl Fn(RouteRequest) -> std::future::Ready<Result<RouteResponse, RouteError>>
           + Send
           + Sync {
        move |req: RouteRequest| {
            std::future::ready(Ok(RouteResponse::ok(json!({
                "label": label,
                "method": req.method.as_str(),
                "prefix": req.prefix(),
                "credentials": req.credentials,
                "payload": req.payload,
            }))))
        }
    }

    fn graphql_method() -> Method {
        Method::from_bytes(b"GRAPHQL").unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_matches_method_and_path() {
        let mut router = Router::new();
        router
            .route(Route::get("/person", echo("get")))
            .route(Route::any("/person", echo("any")));
        let router = router.start().unwrap();

        let get = router.dispatch(RouteRequest::get("/person")).await;
        assert_eq!(get.json_body().unwrap()["label"], "get");

        let post = router.dispatch(RouteRequest::post("/person")).await;
        assert_eq!(post.json_body().unwrap()["label"], "any");

        let missing = router.dispatch(RouteRequest::get("/nobody")).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_internal_methods_are_hidden_from_network() {
        let mut router = Router::new();
        router
            .reserve_internal_method(graphql_method())
            .route(Route::new(graphql_method(), "/person", echo("bridge")));
        let router = router.start().unwrap();

        let network = router
            .dispatch(RouteRequest::new(graphql_method(), "/person"))
            .await;
        assert_eq!(network.status, StatusCode::NOT_FOUND);

        let internal = router
            .inject(RouteRequest::new(graphql_method(), "/person").payload(json!({"a": 1})))
            .await;
        assert_eq!(internal.status, StatusCode::OK);
        assert_eq!(internal.json_body().unwrap()["payload"], json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_auth_strategy_guards_route() {
        let mut router = Router::new();
        router
            .auth_strategy("token", BearerTokens::new().token("t0k", json!({"id": 7})))
            .route(Route::get("/me", echo("me")).auth("token"));
        let router = router.start().unwrap();

        let anonymous = router.dispatch(RouteRequest::get("/me")).await;
        assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            anonymous.json_body().unwrap()["message"],
            "Missing authentication"
        );

        let signed = router
            .dispatch(RouteRequest::get("/me").header("Authorization", "Bearer t0k"))
            .await;
        assert_eq!(signed.json_body().unwrap()["credentials"], json!({"id": 7}));
    }

    #[tokio::test]
    async fn test_realm_prefix_and_pre_start_hooks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        {
            let mut realm = router.realm("/test");
            realm.route(Route::post("/createPerson", echo("create")).tag("graphql"));
            let seen = Arc::clone(&seen);
            realm.on_pre_start(move |routes| {
                seen.lock().unwrap().extend(
                    routes
                        .iter()
                        .filter(|r| r.has_tag("graphql"))
                        .map(|r| (r.path.clone(), r.local_path().to_string())),
                );
                Ok(())
            });
        }
        let router = router.start().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("/test/createPerson".to_string(), "/createPerson".to_string())]
        );
        let response = router.dispatch(RouteRequest::post("/test/createPerson")).await;
        assert_eq!(response.json_body().unwrap()["prefix"], "/test");
    }

    #[test]
    fn test_start_rejects_bad_tables() {
        let mut duplicate = Router::new();
        duplicate
            .route(Route::get("/a", echo("1")))
            .route(Route::get("/a", echo("2")));
        assert!(matches!(
            duplicate.start(),
            Err(RouterError::DuplicateRoute { .. })
        ));

        let mut unknown = Router::new();
        unknown.route(Route::get("/a", echo("1")).auth("nope"));
        assert!(matches!(
            unknown.start(),
            Err(RouterError::UnknownStrategy { .. })
        ));

        let mut failing = Router::new();
        failing.on_pre_start(|_| Err(RouterError::pre_start("boom")));
        assert!(matches!(failing.start(), Err(RouterError::PreStart(_))));
    }
}
