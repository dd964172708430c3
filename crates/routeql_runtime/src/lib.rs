//! Runtime for routeql.
//!
//! This crate turns schema documents and resolver maps into executable
//! schemas:
//! - `document`: SDL parsing, schema model and incremental merge
//! - `scalars`, `directives`: directive-driven scalar behavior
//! - `resolver`: resolver contract and resolver maps
//! - `builder`: executable schema wiring
//! - `executor`: parse/validate/execute with phase reporting
//! - `events`, `timing`: field lifecycle listeners and per-field timings
//! - `channel`: subscription channel paths

pub mod builder;
pub mod channel;
pub mod context;
pub mod directives;
pub mod document;
pub mod error;
pub mod events;
pub mod executor;
pub mod resolver;
pub mod scalars;
pub mod timing;

pub use builder::{build_executable_schema, BuildOptions, ExecutableSchema, PreResolveHook};
pub use channel::{channel_pattern, concrete_path, ChannelSource};
pub use context::{AuxContext, RequestContext, TypedContext};
pub use directives::{DecorationRequest, DecorationTarget, Decorations};
pub use document::{SchemaDocument, TypeDef, TypeKindTag, TypeRef};
pub use error::{ErrorCode, RouteqlError, RouteqlResult};
pub use events::{FieldEvent, FieldListener, FieldPhase, Lifecycle};
pub use executor::{Execution, GraphqlRequest, Phase, Rejection};
pub use resolver::{
    AuxFnResolver, DefaultResolver, FnResolver, Resolver, ResolverArgs, ResolverEntry,
    ResolverError, ResolverFuture, ResolverInfo, ResolverKey, ResolverMap, ResolverResult,
    SharedResolver,
};
pub use scalars::{
    Constraint, DecoratedScalar, DirectiveArg, DirectiveArgs, ScalarBehavior, ScalarFactories,
    ScalarFactory, ValidationError, ValidationErrorCode, ValidationErrors,
};
pub use timing::{FieldTiming, FieldTimings};
