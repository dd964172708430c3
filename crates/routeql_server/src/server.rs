//! The GraphQL plugin handle.

use crate::bridge::{bridge_resolvers, graphql_method};
use crate::config::GraphqlOptions;
use crate::dispatch::Dispatcher;
use crate::graphiql::GraphiqlPage;
use crate::registry::{SchemaRegistry, SchemaSource};
use crate::subscriptions::SubscriptionPublisher;
use futures::stream::{BoxStream, StreamExt};
use routeql_router::{Realm, Route, Router, RouterError};
use routeql_runtime::{
    BuildOptions, ChannelSource, ErrorCode, Execution, FieldEvent, GraphqlRequest, Lifecycle,
    Phase, RequestContext, ResolverMap, RouteqlError, RouteqlResult,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// A GraphQL endpoint bound to its own schema registry.
///
/// # Example
///
/// ```
/// use routeql_router::Router;
/// use routeql_runtime::ResolverMap;
/// use routeql_server::{GraphqlOptions, GraphqlServer};
///
/// let mut resolvers = ResolverMap::new();
/// resolvers.register_fn("Query", "hello", |_, _, _, _| Ok(serde_json::json!("world")));
///
/// let server = GraphqlServer::new(
///     GraphqlOptions::new()
///         .schema("type Query { hello: String }")
///         .resolvers(resolvers),
/// )
/// .unwrap();
///
/// let mut router = Router::new();
/// server.mount_root(&mut router);
/// let router = router.start().unwrap();
/// ```
pub struct GraphqlServer {
    options: GraphqlOptions,
    registry: Arc<SchemaRegistry>,
    lifecycle: Arc<Lifecycle>,
    publisher: Option<SubscriptionPublisher>,
}

impl GraphqlServer {
    /// Creates the server and registers the schema and resolvers from
    /// `options`, if any.
    pub fn new(options: GraphqlOptions) -> RouteqlResult<Self> {
        let lifecycle = Arc::new(Lifecycle::new());
        let publisher = options.pubsub.clone().map(SubscriptionPublisher::new);
        let build = BuildOptions {
            pre_resolve: options.pre_resolve.clone(),
            scalars: options.scalars.clone(),
            lifecycle: Arc::clone(&lifecycle),
            channels: options
                .pubsub
                .clone()
                .map(|pubsub| Arc::new(pubsub) as Arc<dyn ChannelSource>),
        };
        let registry = Arc::new(SchemaRegistry::new(
            build,
            publisher.clone(),
            options.subscription_options.clone(),
        ));

        if options.schema.is_some() || !options.resolvers.is_empty() {
            registry.register(options.schema.clone(), options.resolvers.clone())?;
        }
        info!(
            graphql_path = %options.graphql_path,
            graphiql_path = ?options.graphiql_path,
            realtime = publisher.is_some(),
            "graphql server created"
        );

        Ok(Self {
            options,
            registry,
            lifecycle,
            publisher,
        })
    }

    pub fn options(&self) -> &GraphqlOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Merges a schema and resolvers into the active schema.
    pub fn register(&self, source: Option<SchemaSource>, resolvers: ResolverMap) -> RouteqlResult<()> {
        self.registry.register(source, resolvers)
    }

    /// Registers a schema together with its resolvers.
    pub fn register_schema(
        &self,
        schema: impl Into<SchemaSource>,
        resolvers: ResolverMap,
    ) -> RouteqlResult<()> {
        self.registry.register(Some(schema.into()), resolvers)
    }

    /// Adds a listener called before every field resolver.
    pub fn on_before_resolve<F>(&self, listener: F)
    where
        F: Fn(&FieldEvent<'_>) + Send + Sync + 'static,
    {
        self.lifecycle.on_before_resolve(listener);
    }

    /// Adds a listener called after every field resolver.
    pub fn on_after_resolve<F>(&self, listener: F)
    where
        F: Fn(&FieldEvent<'_>) + Send + Sync + 'static,
    {
        self.lifecycle.on_after_resolve(listener);
    }

    /// Publishes an event for the subscription field `event_name`. Returns the
    /// number of subscribers reached.
    pub async fn publish(&self, event_name: &str, payload: Value) -> RouteqlResult<usize> {
        let publisher = self.publisher.as_ref().ok_or_else(|| {
            RouteqlError::dependency("Publishing requires a realtime transport")
        })?;
        let schema = self.active_schema()?;
        publisher.publish(&schema, event_name, payload)
    }

    /// Executes a query or mutation in-process and returns the response
    /// envelope.
    pub async fn execute(&self, request: GraphqlRequest, ctx: RequestContext) -> RouteqlResult<Value> {
        let schema = self.active_schema()?;
        match schema.execute(request, ctx).await {
            Execution::Rejected(rejection) => Err(match rejection.phase {
                Phase::Parse => RouteqlError::parse(rejection.message()),
                Phase::Validation => RouteqlError::validation(rejection.message()),
            }),
            Execution::Completed(mut response) => {
                if let Some(format_error) = &self.options.format_error {
                    response.errors = response.errors.into_iter().map(|e| format_error(e)).collect();
                }
                serde_json::to_value(&response)
                    .map_err(|e| RouteqlError::internal(format!("Failed to serialize response: {e}")))
            }
        }
    }

    /// Starts a subscription operation. Every published event matching the
    /// operation's channel yields one response envelope.
    pub fn subscribe(
        &self,
        request: GraphqlRequest,
        ctx: RequestContext,
    ) -> RouteqlResult<BoxStream<'static, Value>> {
        let schema = self.active_schema()?;
        let format_error = self.options.format_error.clone();
        Ok(schema
            .execute_stream(request, ctx)
            .map(move |mut response| {
                if let Some(format_error) = &format_error {
                    response.errors = response.errors.into_iter().map(|e| format_error(e)).collect();
                }
                serde_json::to_value(&response).unwrap_or(Value::Null)
            })
            .boxed())
    }

    /// Adds the GraphQL endpoint, the GraphiQL page and the route bridge to
    /// a realm.
    pub fn mount(&self, realm: &mut Realm<'_>) {
        let options = &self.options;
        realm.reserve_internal_method(graphql_method());
        realm.route(
            Route::any(
                &options.graphql_path,
                Dispatcher::new(
                    Arc::clone(&self.registry),
                    options.format_error.clone(),
                    options.tracing,
                ),
            )
            .auth_opt(options.auth_strategy.clone()),
        );
        if let Some(graphiql_path) = &options.graphiql_path {
            realm.route(
                Route::any(graphiql_path, GraphiqlPage::new(options.graphql_path.clone()))
                    .auth_opt(options.graphiql_auth_strategy.clone()),
            );
        }

        let registry = Arc::clone(&self.registry);
        let forward_headers = options.forward_headers.clone();
        realm.on_pre_start(move |routes| {
            let resolvers = bridge_resolvers(routes, &forward_headers);
            if resolvers.is_empty() {
                return Ok(());
            }
            debug!(fields = resolvers.len(), "registering bridged routes");
            registry
                .register(None, resolvers)
                .map_err(RouterError::pre_start)
        });
    }

    /// Mounts outside any realm.
    pub fn mount_root(&self, router: &mut Router) {
        self.mount(&mut router.realm(""));
    }

    fn active_schema(&self) -> RouteqlResult<routeql_runtime::ExecutableSchema> {
        self.registry
            .current()
            .ok_or_else(|| RouteqlError::new(ErrorCode::NoSchema, "no schema registered"))
    }
}

impl std::fmt::Debug for GraphqlServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlServer")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("realtime", &self.publisher.is_some())
            .finish()
    }
}
