//! GraphQL endpoint for routeql.
//!
//! - `config`: endpoint options
//! - `registry`: the active schema and incremental registration
//! - `bridge`: routes exposed as GraphQL fields
//! - `pubsub`, `subscriptions`: realtime channels and publishing
//! - `dispatch`: the GraphQL request handler
//! - `graphiql`: the GraphiQL page
//! - `server`: the [`GraphqlServer`] handle tying them together

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod graphiql;
pub mod pubsub;
pub mod registry;
pub mod server;
pub mod subscriptions;

pub use bridge::{graphql_method, BridgeResolver, GRAPHQL_METHOD, GRAPHQL_TAG};
pub use config::{ErrorFormatter, GraphqlOptions};
pub use dispatch::Dispatcher;
pub use graphiql::GraphiqlPage;
pub use pubsub::PubSub;
pub use registry::{RegistryState, SchemaRegistry, SchemaSource};
pub use server::GraphqlServer;
pub use subscriptions::SubscriptionPublisher;
