//! The active (schema, resolver map) pair.
//!
//! Registrations merge into the active pair and rebuild the executable
//! schema; the result replaces the active pair with one atomic store.
//! Readers load the pair without locking. A failed registration leaves the
//! active pair untouched.

use crate::subscriptions::SubscriptionPublisher;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use routeql_runtime::{
    build_executable_schema, BuildOptions, ExecutableSchema, ResolverMap, RouteqlError,
    RouteqlResult, SchemaDocument,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Schema input of a registration.
#[derive(Clone)]
pub enum SchemaSource {
    /// SDL text.
    Sdl(String),
    /// An already parsed document.
    Document(SchemaDocument),
    /// A built schema. The first registration uses it as-is.
    Executable(ExecutableSchema),
}

impl From<&str> for SchemaSource {
    fn from(sdl: &str) -> Self {
        Self::Sdl(sdl.to_string())
    }
}

impl From<String> for SchemaSource {
    fn from(sdl: String) -> Self {
        Self::Sdl(sdl)
    }
}

impl From<SchemaDocument> for SchemaSource {
    fn from(document: SchemaDocument) -> Self {
        Self::Document(document)
    }
}

impl From<ExecutableSchema> for SchemaSource {
    fn from(schema: ExecutableSchema) -> Self {
        Self::Executable(schema)
    }
}

/// Snapshot of the registry.
#[derive(Clone, Default)]
pub struct RegistryState {
    /// Active schema; `None` until a schema has been registered.
    pub schema: Option<ExecutableSchema>,
    /// Every resolver registered so far, merged.
    pub resolvers: ResolverMap,
}

/// Owner of the active schema of one server.
pub struct SchemaRegistry {
    active: ArcSwap<RegistryState>,
    writer: Mutex<()>,
    build: BuildOptions,
    publisher: Option<SubscriptionPublisher>,
    subscription_options: Option<Value>,
}

impl SchemaRegistry {
    pub fn new(
        build: BuildOptions,
        publisher: Option<SubscriptionPublisher>,
        subscription_options: Option<Value>,
    ) -> Self {
        Self {
            active: ArcSwap::from_pointee(RegistryState::default()),
            writer: Mutex::new(()),
            build,
            publisher,
            subscription_options,
        }
    }

    /// The active schema.
    pub fn current(&self) -> Option<ExecutableSchema> {
        self.active.load().schema.clone()
    }

    /// The active pair.
    pub fn state(&self) -> Arc<RegistryState> {
        self.active.load_full()
    }

    /// Merges a schema and resolvers into the active pair.
    ///
    /// With `source == None` only resolvers are merged: the schema is rebuilt
    /// when one is active, otherwise the resolvers wait for the first schema.
    pub fn register(&self, source: Option<SchemaSource>, resolvers: ResolverMap) -> RouteqlResult<()> {
        let _writer = self.writer.lock();
        let current = self.active.load_full();
        let next = self.next_state(&current, source, resolvers)?;

        if let Some(schema) = &next.schema {
            self.wire_subscriptions(schema)?;
            debug!(
                types = schema.document().types.len(),
                resolvers = next.resolvers.len(),
                "schema registered"
            );
        } else {
            debug!(resolvers = next.resolvers.len(), "resolvers pending until a schema is registered");
        }
        self.active.store(Arc::new(next));
        Ok(())
    }

    fn next_state(
        &self,
        current: &RegistryState,
        source: Option<SchemaSource>,
        resolvers: ResolverMap,
    ) -> RouteqlResult<RegistryState> {
        let (incoming, carried) = match source {
            None => (None, ResolverMap::new()),
            Some(SchemaSource::Sdl(sdl)) => {
                (Some(SchemaDocument::parse_fragment(&sdl)?), ResolverMap::new())
            }
            Some(SchemaSource::Document(document)) => (Some(document), ResolverMap::new()),
            Some(SchemaSource::Executable(schema)) => {
                if current.schema.is_none() && current.resolvers.is_empty() && resolvers.is_empty() {
                    return Ok(RegistryState {
                        resolvers: schema.resolvers().clone(),
                        schema: Some(schema),
                    });
                }
                (Some(schema.document().clone()), schema.resolvers().clone())
            }
        };

        let merged = current.resolvers.merged(&carried).merged(&resolvers);
        let active = current.schema.as_ref().map(ExecutableSchema::document);
        let document = match (active, incoming) {
            (Some(active), Some(incoming)) => Some(active.merge(&incoming)?),
            (None, Some(incoming)) => Some(incoming),
            (Some(active), None) => Some(active.clone()),
            (None, None) => None,
        };

        let schema = document
            .map(|document| build_executable_schema(document, merged.clone(), &self.build))
            .transpose()?;
        Ok(RegistryState {
            schema,
            resolvers: merged,
        })
    }

    fn wire_subscriptions(&self, schema: &ExecutableSchema) -> RouteqlResult<()> {
        if schema.document().subscription_fields().next().is_none() {
            return Ok(());
        }
        let publisher = self.publisher.as_ref().ok_or_else(|| {
            RouteqlError::dependency(
                "The schema defines subscriptions but no realtime transport is configured",
            )
        })?;
        let patterns = publisher.register_channels(schema, self.subscription_options.as_ref());
        debug!(?patterns, "subscription channels registered");
        Ok(())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.active.load();
        f.debug_struct("SchemaRegistry")
            .field("schema", &state.schema)
            .field("resolvers", &state.resolvers.len())
            .field("realtime", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::PubSub;
    use routeql_runtime::{ErrorCode, Execution, GraphqlRequest, RequestContext};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(BuildOptions::default(), None, None)
    }

    async fn query(registry: &SchemaRegistry, query: &str) -> Value {
        let schema = registry.current().expect("active schema");
        match schema
            .execute(GraphqlRequest::new(query), RequestContext::new())
            .await
        {
            Execution::Completed(response) => {
                assert!(response.errors.is_empty(), "{:?}", response.errors);
                response.data.into_json().unwrap()
            }
            Execution::Rejected(rejection) => panic!("{}", rejection.message()),
        }
    }

    #[tokio::test]
    async fn test_registrations_merge() {
        let registry = registry();

        let mut first = ResolverMap::new();
        first.register_fn("Query", "hello", |_, _, _, _| Ok(json!("world")));
        registry
            .register(Some("type Query { hello: String }".into()), first)
            .unwrap();

        let mut second = ResolverMap::new();
        second.register_fn("Query", "answer", |_, _, _, _| Ok(json!(42)));
        registry
            .register(Some("type Query { answer: Int }".into()), second)
            .unwrap();

        assert_eq!(
            query(&registry, "{ hello answer }").await,
            json!({"hello": "world", "answer": 42})
        );
        assert_eq!(registry.state().resolvers.len(), 2);
    }

    #[tokio::test]
    async fn test_reregistering_same_pair_is_idempotent() {
        let registry = registry();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let mut resolvers = ResolverMap::new();
            resolvers.register_fn("Query", "hello", move |_, _, _, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("world"))
            });
            registry
                .register(Some("type Query { hello: String }".into()), resolvers)
                .unwrap();
        }

        assert_eq!(query(&registry, "{ hello }").await, json!({"hello": "world"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.current().unwrap().document().types.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_keeps_active_state() {
        let registry = registry();
        registry
            .register(Some("type Query { hello: String }".into()), ResolverMap::new())
            .unwrap();

        let err = registry
            .register(Some("type Query { hello: Int }".into()), ResolverMap::new())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MergeConflict);
        assert!(registry.current().unwrap().sdl().contains("hello: String"));
    }

    #[tokio::test]
    async fn test_root_less_fragments_merge() {
        let registry = SchemaRegistry::new(
            BuildOptions::default().channels(Arc::new(PubSub::new())),
            Some(SubscriptionPublisher::new(PubSub::new())),
            None,
        );
        let missing_query = registry
            .register(Some("type Mutation { b: Int }".into()), ResolverMap::new())
            .unwrap_err();
        assert!(missing_query.message.contains("Query root"));
        assert!(registry.current().is_none());

        registry
            .register(Some("type Query { a: Int }".into()), ResolverMap::new())
            .unwrap();

        let mut writes = ResolverMap::new();
        writes.register_fn("Mutation", "b", |_, _, _, _| Ok(json!(2)));
        registry
            .register(Some("type Mutation { b: Int }".into()), writes)
            .unwrap();
        registry
            .register(Some("type Subscription { tick: Int }".into()), ResolverMap::new())
            .unwrap();

        let document = registry.current().unwrap().document().clone();
        assert_eq!(document.query_type.as_deref(), Some("Query"));
        assert_eq!(document.mutation_type.as_deref(), Some("Mutation"));
        assert_eq!(document.subscription_type.as_deref(), Some("Subscription"));
        assert_eq!(query(&registry, "mutation { b }").await, json!({"b": 2}));
    }

    #[tokio::test]
    async fn test_pending_resolvers_wait_for_schema() {
        let registry = registry();
        let mut resolvers = ResolverMap::new();
        resolvers.register_fn("Query", "hello", |_, _, _, _| Ok(json!("later")));
        registry.register(None, resolvers).unwrap();
        assert!(registry.current().is_none());

        registry
            .register(Some("type Query { hello: String }".into()), ResolverMap::new())
            .unwrap();
        assert_eq!(query(&registry, "{ hello }").await, json!({"hello": "later"}));
    }

    #[test]
    fn test_subscriptions_need_transport() {
        let sdl = "type Query { ok: Boolean } type Subscription { tick: Int }";
        let err = registry()
            .register(Some(sdl.into()), ResolverMap::new())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DependencyError);

        let pubsub = PubSub::new();
        let wired = SchemaRegistry::new(
            BuildOptions::default().channels(Arc::new(pubsub.clone())),
            Some(SubscriptionPublisher::new(pubsub.clone())),
            Some(json!({"retain": false})),
        );
        wired.register(Some(sdl.into()), ResolverMap::new()).unwrap();
        assert_eq!(
            pubsub.patterns(),
            vec![("/tick".to_string(), Some(json!({"retain": false})))]
        );
    }

    #[test]
    fn test_executable_schema_used_as_is() {
        let schema = ExecutableSchema::from_sdl("type Query { a: Int }", ResolverMap::new()).unwrap();
        let registry = registry();
        registry.register(Some(schema.into()), ResolverMap::new()).unwrap();
        assert!(registry.current().unwrap().document().get_type("Query").is_some());
    }
}
