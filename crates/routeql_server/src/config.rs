//! GraphQL endpoint options.

use crate::pubsub::PubSub;
use crate::registry::SchemaSource;
use async_graphql::ServerError;
use routeql_runtime::{
    AuxContext, PreResolveHook, RequestContext, ResolverArgs, ResolverMap, ScalarFactories,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Remaps a field error before it is sent to the client. The original
/// resolver error is reachable through `ServerError::source`.
pub type ErrorFormatter = Arc<dyn Fn(ServerError) -> ServerError + Send + Sync>;

/// Options of a [`GraphqlServer`](crate::GraphqlServer).
#[derive(Clone)]
pub struct GraphqlOptions {
    /// Path of the GraphQL endpoint. Default `/graphql`.
    pub graphql_path: String,
    /// Path of the GraphiQL page; `None` disables it. Default `/graphiql`.
    pub graphiql_path: Option<String>,
    /// Schema registered on startup.
    pub schema: Option<SchemaSource>,
    /// Resolvers registered on startup.
    pub resolvers: ResolverMap,
    /// Auth strategy guarding the GraphQL endpoint.
    pub auth_strategy: Option<String>,
    /// Auth strategy guarding the GraphiQL page.
    pub graphiql_auth_strategy: Option<String>,
    pub format_error: Option<ErrorFormatter>,
    /// Options forwarded verbatim to the realtime transport for every channel.
    pub subscription_options: Option<Value>,
    /// Realtime transport. Required once the schema has a subscription root.
    pub pubsub: Option<PubSub>,
    pub pre_resolve: Option<PreResolveHook>,
    /// Opens request and field spans and records field timings.
    pub tracing: bool,
    /// Headers copied from the GraphQL request onto bridged route calls.
    pub forward_headers: Vec<String>,
    /// Scalar directive factories. Defaults to the builtin set.
    pub scalars: ScalarFactories,
}

impl Default for GraphqlOptions {
    fn default() -> Self {
        Self {
            graphql_path: "/graphql".to_string(),
            graphiql_path: Some("/graphiql".to_string()),
            schema: None,
            resolvers: ResolverMap::new(),
            auth_strategy: None,
            graphiql_auth_strategy: None,
            format_error: None,
            subscription_options: None,
            pubsub: None,
            pre_resolve: None,
            tracing: false,
            forward_headers: vec!["authorization".to_string(), "cookie".to_string()],
            scalars: ScalarFactories::builtin(),
        }
    }
}

impl GraphqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn graphql_path(mut self, path: impl Into<String>) -> Self {
        self.graphql_path = path.into();
        self
    }

    #[must_use]
    pub fn graphiql_path(mut self, path: Option<String>) -> Self {
        self.graphiql_path = path;
        self
    }

    #[must_use]
    pub fn no_graphiql(self) -> Self {
        self.graphiql_path(None)
    }

    #[must_use]
    pub fn schema(mut self, schema: impl Into<SchemaSource>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers = resolvers;
        self
    }

    #[must_use]
    pub fn auth_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.auth_strategy = Some(strategy.into());
        self
    }

    #[must_use]
    pub fn graphiql_auth_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.graphiql_auth_strategy = Some(strategy.into());
        self
    }

    #[must_use]
    pub fn format_error<F>(mut self, formatter: F) -> Self
    where
        F: Fn(ServerError) -> ServerError + Send + Sync + 'static,
    {
        self.format_error = Some(Arc::new(formatter));
        self
    }

    #[must_use]
    pub fn subscription_options(mut self, options: Value) -> Self {
        self.subscription_options = Some(options);
        self
    }

    #[must_use]
    pub fn pubsub(mut self, pubsub: PubSub) -> Self {
        self.pubsub = Some(pubsub);
        self
    }

    #[must_use]
    pub fn pre_resolve<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &RequestContext) -> AuxContext + Send + Sync + 'static,
    {
        self.pre_resolve = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    #[must_use]
    pub fn forward_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forward_headers = headers
            .into_iter()
            .map(|h| h.into().to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn scalars(mut self, scalars: ScalarFactories) -> Self {
        self.scalars = scalars;
        self
    }
}

impl fmt::Debug for GraphqlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlOptions")
            .field("graphql_path", &self.graphql_path)
            .field("graphiql_path", &self.graphiql_path)
            .field("schema", &self.schema.is_some())
            .field("resolvers", &self.resolvers.len())
            .field("auth_strategy", &self.auth_strategy)
            .field("graphiql_auth_strategy", &self.graphiql_auth_strategy)
            .field("format_error", &self.format_error.is_some())
            .field("subscription_options", &self.subscription_options)
            .field("pubsub", &self.pubsub.is_some())
            .field("pre_resolve", &self.pre_resolve.is_some())
            .field("tracing", &self.tracing)
            .field("forward_headers", &self.forward_headers)
            .finish_non_exhaustive()
    }
}
