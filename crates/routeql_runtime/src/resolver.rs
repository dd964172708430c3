//! Resolver contract and resolver maps.
//!
//! A resolver receives `(aux, parent, args, ctx, info)` and produces a JSON
//! value asynchronously. `aux` is the auxiliary context produced by the
//! pre-resolve hook (empty when none is configured).
//!
//! [`ResolverMap`] holds the entries that get wired into an executable schema,
//! keyed by `(type, field)`. Besides field resolvers an entry can carry a
//! scalar function, an enum internal value, or an abstract type resolver; the
//! builder checks that the entry kind matches the kind of the named type.

use crate::context::{AuxContext, RequestContext};
use crate::scalars::ValidationErrors;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Arguments passed to a resolver.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    args: HashMap<String, Value>,
}

impl ResolverArgs {
    /// Creates new resolver args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an argument by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Gets an argument as a specific type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, returning an error if not found.
    pub fn require<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.args
            .get(name)
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
            .and_then(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| ResolverError::ArgumentParseError(name.to_string(), e.to_string()))
            })
    }

    /// Returns all arguments.
    pub fn all(&self) -> &HashMap<String, Value> {
        &self.args
    }

    /// Returns the arguments as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.args
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Sets an argument.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.args.insert(name.into(), value);
    }
}

/// Info about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// The field name being resolved.
    pub field_name: String,

    /// The return type, rendered in SDL notation (`[Person!]!`).
    pub return_type: String,

    /// The parent type name.
    pub parent_type: String,

    /// Response path to this field.
    pub path: Vec<String>,
}

impl ResolverInfo {
    /// Creates new resolver info.
    pub fn new(field_name: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            return_type: String::new(),
            parent_type: parent_type.into(),
            path: Vec::new(),
        }
    }

    /// Sets the return type.
    #[must_use]
    pub fn with_return_type(mut self, ty: impl Into<String>) -> Self {
        self.return_type = ty.into();
        self
    }

    /// Sets the path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    /// Dotted response path, e.g. `people.0.lastname`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Result type for resolvers.
pub type ResolverResult = Result<Value, ResolverError>;

/// Future type for async resolvers.
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// Error from a resolver. Becomes a field-level GraphQL error.
#[derive(Debug, Clone)]
pub enum ResolverError {
    /// Field not found.
    FieldNotFound(String),

    /// Missing required argument.
    MissingArgument(String),

    /// Argument parse error.
    ArgumentParseError(String, String),

    /// A directive scalar rejected an input or output value.
    Validation(ValidationErrors),

    /// An internal route call answered with a status of 400 or above.
    Http {
        status: u16,
        error: String,
        message: String,
    },

    /// Authentication was required and missing.
    Unauthorized(String),

    /// Custom error.
    Custom(String),

    /// Internal error.
    Internal(String),
}

impl ResolverError {
    /// Creates a custom error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Converts into a GraphQL error carrying extensions and the original
    /// error as its source.
    pub fn into_graphql_error(self) -> async_graphql::Error {
        use async_graphql::ErrorExtensions;

        let mut error = async_graphql::Error::new(self.to_string());
        error = match &self {
            Self::Http { status, error: kind, .. } => error.extend_with(|_, e| {
                e.set("statusCode", i64::from(*status));
                e.set("error", kind.as_str());
            }),
            Self::Validation(errors) => error.extend_with(|_, e| {
                e.set("code", "VALIDATION_ERROR");
                if let Some(first) = errors.errors.first() {
                    e.set("field", first.field.as_str());
                }
            }),
            Self::Unauthorized(_) => error.extend_with(|_, e| {
                e.set("statusCode", 401);
                e.set("error", "Unauthorized");
            }),
            _ => error,
        };
        error.source = Some(Arc::new(self));
        error
    }
}

impl std::fmt::Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldNotFound(field) => write!(f, "Field not found: {field}"),
            Self::MissingArgument(arg) => write!(f, "Missing required argument: {arg}"),
            Self::ArgumentParseError(arg, err) => {
                write!(f, "Failed to parse argument '{arg}': {err}")
            }
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::Http { message, .. } | Self::Unauthorized(message) | Self::Custom(message) => {
                write!(f, "{message}")
            }
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ResolverError {}

impl From<ValidationErrors> for ResolverError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Trait for field resolvers.
pub trait Resolver: Send + Sync {
    /// Resolves a field value.
    fn resolve<'a>(
        &'a self,
        aux: &'a AuxContext,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a RequestContext,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a>;
}

/// A shared resolver.
pub type SharedResolver = Arc<dyn Resolver>;

/// A sync resolver function.
pub type SyncResolverFn = Arc<
    dyn Fn(&Value, &ResolverArgs, &RequestContext, &ResolverInfo) -> ResolverResult + Send + Sync,
>;

/// A wrapper for sync resolver functions.
pub struct FnResolver {
    func: SyncResolverFn,
}

impl FnResolver {
    /// Creates a new function resolver.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &RequestContext, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        Self { func: Arc::new(f) }
    }
}

impl Resolver for FnResolver {
    fn resolve<'a>(
        &'a self,
        _aux: &'a AuxContext,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a RequestContext,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let result = (self.func)(parent, args, ctx, info);
        Box::pin(async move { result })
    }
}

/// An async resolver function that also receives the auxiliary context.
pub type AuxResolverFn = Arc<
    dyn Fn(AuxContext, Value, ResolverArgs, RequestContext, ResolverInfo) -> ResolverFuture<'static>
        + Send
        + Sync,
>;

/// A wrapper for async resolver functions that read the auxiliary context.
pub struct AuxFnResolver {
    func: AuxResolverFn,
}

impl AuxFnResolver {
    /// Creates a new resolver from a function taking the auxiliary context first.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(AuxContext, Value, ResolverArgs, RequestContext, ResolverInfo) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self {
            func: Arc::new(move |aux, parent, args, ctx, info| {
                Box::pin(f(aux, parent, args, ctx, info))
            }),
        }
    }
}

impl Resolver for AuxFnResolver {
    fn resolve<'a>(
        &'a self,
        aux: &'a AuxContext,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a RequestContext,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let fut = (self.func)(
            aux.clone(),
            parent.clone(),
            args.clone(),
            ctx.clone(),
            info.clone(),
        );
        Box::pin(fut)
    }
}

/// Default resolver that accesses properties from the parent object.
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve<'a>(
        &'a self,
        _aux: &'a AuxContext,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a RequestContext,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let field_name = &info.field_name;
        let result = match parent {
            Value::Object(map) => Ok(map.get(field_name).cloned().unwrap_or(Value::Null)),
            Value::Null => Ok(Value::Null),
            _ => Err(ResolverError::FieldNotFound(field_name.clone())),
        };
        Box::pin(async move { result })
    }
}

/// A scalar serialize/parse function supplied through the resolver map.
pub type ScalarFn = Arc<dyn Fn(Value) -> Result<Value, ResolverError> + Send + Sync>;

/// Picks the concrete object type for a value returned through an
/// interface or union.
pub type TypeResolverFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// One entry of a [`ResolverMap`].
#[derive(Clone)]
pub enum ResolverEntry {
    /// Field resolver for an object or interface field.
    Field(SharedResolver),
    /// `serialize`, `parseValue` or `parseLiteral` of a scalar type.
    Scalar(ScalarFn),
    /// Internal value of an enum value.
    EnumValue(Value),
    /// `__resolveType` of an interface or union.
    TypeResolver(TypeResolverFn),
}

impl ResolverEntry {
    /// Short name of the entry kind, used in configuration errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Field(_) => "field resolver",
            Self::Scalar(_) => "scalar function",
            Self::EnumValue(_) => "enum value",
            Self::TypeResolver(_) => "type resolver",
        }
    }
}

impl Debug for ResolverEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnumValue(value) => f.debug_tuple("EnumValue").field(value).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Key of a resolver map entry.
///
/// `type_name` is `None` for the bare top-level shorthand, which attaches to
/// the root Query type (or Mutation) at build time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolverKey {
    pub type_name: Option<String>,
    pub field_name: String,
}

impl ResolverKey {
    /// Key for a field of a named type.
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            field_name: field_name.into(),
        }
    }

    /// Bare top-level key.
    pub fn root(field_name: impl Into<String>) -> Self {
        Self {
            type_name: None,
            field_name: field_name.into(),
        }
    }
}

impl std::fmt::Display for ResolverKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(f, "{}.{}", type_name, self.field_name),
            None => write!(f, "{}", self.field_name),
        }
    }
}

/// Resolver entries organized by type and field.
///
/// Cloning is cheap; entries are shared.
#[derive(Default, Clone)]
pub struct ResolverMap {
    entries: IndexMap<ResolverKey, ResolverEntry>,
}

impl ResolverMap {
    /// Creates a new resolver map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any previous entry under the same key.
    pub fn insert(&mut self, key: ResolverKey, entry: ResolverEntry) {
        self.entries.insert(key, entry);
    }

    /// Registers a resolver for a specific type and field.
    pub fn register<R: Resolver + 'static>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: R,
    ) {
        self.insert(
            ResolverKey::new(type_name, field_name),
            ResolverEntry::Field(Arc::new(resolver)),
        );
    }

    /// Registers a bare top-level resolver (root Query, else root Mutation).
    pub fn register_root<R: Resolver + 'static>(
        &mut self,
        field_name: impl Into<String>,
        resolver: R,
    ) {
        self.insert(
            ResolverKey::root(field_name),
            ResolverEntry::Field(Arc::new(resolver)),
        );
    }

    /// Registers a sync function as a resolver.
    pub fn register_fn<F>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) where
        F: Fn(&Value, &ResolverArgs, &RequestContext, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        self.register(type_name, field_name, FnResolver::new(f));
    }

    /// Registers an async function that reads the auxiliary context.
    pub fn register_with_aux<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) where
        F: Fn(AuxContext, Value, ResolverArgs, RequestContext, ResolverInfo) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.register(type_name, field_name, AuxFnResolver::new(f));
    }

    /// Registers a scalar function (`serialize`, `parseValue` or `parseLiteral`).
    pub fn register_scalar_fn<F>(
        &mut self,
        scalar: impl Into<String>,
        function: impl Into<String>,
        f: F,
    ) where
        F: Fn(Value) -> Result<Value, ResolverError> + Send + Sync + 'static,
    {
        self.insert(
            ResolverKey::new(scalar, function),
            ResolverEntry::Scalar(Arc::new(f)),
        );
    }

    /// Registers the internal value of an enum value.
    pub fn register_enum_value(
        &mut self,
        enum_name: impl Into<String>,
        value_name: impl Into<String>,
        internal: Value,
    ) {
        self.insert(
            ResolverKey::new(enum_name, value_name),
            ResolverEntry::EnumValue(internal),
        );
    }

    /// Registers `__resolveType` for an interface or union.
    pub fn register_type_resolver<F>(&mut self, abstract_type: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.insert(
            ResolverKey::new(abstract_type, "__resolveType"),
            ResolverEntry::TypeResolver(Arc::new(f)),
        );
    }

    /// Gets the entry for a type and field.
    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&ResolverEntry> {
        self.entries
            .get(&ResolverKey::new(type_name, field_name))
    }

    /// Gets a field resolver for a type and field.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&SharedResolver> {
        match self.get(type_name, field_name) {
            Some(ResolverEntry::Field(resolver)) => Some(resolver),
            _ => None,
        }
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResolverKey, &ResolverEntry)> {
        self.entries.iter()
    }

    /// Merges `other` into a new map. Entries of `other` win on key collision.
    #[must_use]
    pub fn merged(&self, other: &ResolverMap) -> ResolverMap {
        let mut entries = self.entries.clone();
        for (key, entry) in &other.entries {
            entries.insert(key.clone(), entry.clone());
        }
        ResolverMap { entries }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("entries", &self.entries.keys().map(ToString::to_string).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_args() {
        let mut args = ResolverArgs::new();
        args.set("id", serde_json::json!(123));
        args.set("name", serde_json::json!("test"));

        assert_eq!(args.get_as::<i64>("id"), Some(123));
        assert_eq!(args.get_as::<String>("name"), Some("test".to_string()));
        assert_eq!(args.get_as::<i64>("missing"), None);
        assert!(matches!(
            args.require::<i64>("missing"),
            Err(ResolverError::MissingArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_default_resolver() {
        let resolver = DefaultResolver;
        let parent = serde_json::json!({"firstName": "Alice", "last_name": "Smith"});
        let args = ResolverArgs::new();
        let ctx = RequestContext::new();
        let aux = AuxContext::new();

        let first = ResolverInfo::new("firstName", "Person");
        let result = resolver.resolve(&aux, &parent, &args, &ctx, &first).await;
        assert_eq!(result.unwrap(), serde_json::json!("Alice"));

        // property names are matched exactly
        let last = ResolverInfo::new("lastName", "Person");
        let result = resolver.resolve(&aux, &parent, &args, &ctx, &last).await;
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_fn_resolver() {
        let resolver = FnResolver::new(|_parent, args, _ctx, _info| {
            let id: i64 = args.require("id")?;
            Ok(serde_json::json!({"id": id, "name": "User"}))
        });

        let parent = serde_json::json!({});
        let mut args = ResolverArgs::new();
        args.set("id", serde_json::json!(42));
        let ctx = RequestContext::new();
        let info = ResolverInfo::new("user", "Query");

        let result = resolver
            .resolve(&AuxContext::new(), &parent, &args, &ctx, &info)
            .await;
        assert_eq!(result.unwrap(), serde_json::json!({"id": 42, "name": "User"}));
    }

    #[tokio::test]
    async fn test_aux_resolver_sees_aux_context() {
        #[derive(Clone)]
        struct Tenant(&'static str);

        let resolver = AuxFnResolver::new(|aux: AuxContext, _parent, _args, _ctx, _info| async move {
            let tenant = aux.get::<Tenant>().map(|t| t.0).unwrap_or("none");
            Ok(serde_json::json!(tenant))
        });

        let mut aux = AuxContext::new();
        aux.insert(Tenant("acme"));
        let result = resolver
            .resolve(
                &aux,
                &Value::Null,
                &ResolverArgs::new(),
                &RequestContext::new(),
                &ResolverInfo::new("tenant", "Query"),
            )
            .await;
        assert_eq!(result.unwrap(), serde_json::json!("acme"));
    }

    #[test]
    fn test_resolver_map_merge_last_wins() {
        let mut first = ResolverMap::new();
        first.register_fn("Query", "hello", |_, _, _, _| Ok(serde_json::json!("first")));
        first.register_enum_value("Color", "RED", serde_json::json!("#f00"));

        let mut second = ResolverMap::new();
        second.register_fn("Query", "hello", |_, _, _, _| Ok(serde_json::json!("second")));
        second.register_root(
            "createPerson",
            FnResolver::new(|_, _, _, _| Ok(Value::Null)),
        );

        let merged = first.merged(&second);
        assert_eq!(merged.len(), 3);
        assert!(merged.field("Query", "hello").is_some());
        assert!(matches!(
            merged.get("Color", "RED"),
            Some(ResolverEntry::EnumValue(v)) if v == "#f00"
        ));
        // originals are untouched
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_resolver_map_merge_prefers_later_resolver() {
        let mut first = ResolverMap::new();
        first.register_fn("Query", "hello", |_, _, _, _| Ok(serde_json::json!("first")));
        let mut second = ResolverMap::new();
        second.register_fn("Query", "hello", |_, _, _, _| Ok(serde_json::json!("second")));

        let merged = first.merged(&second);
        let resolver = merged.field("Query", "hello").unwrap();
        let result = resolver
            .resolve(
                &AuxContext::new(),
                &Value::Null,
                &ResolverArgs::new(),
                &RequestContext::new(),
                &ResolverInfo::new("hello", "Query"),
            )
            .await;
        assert_eq!(result.unwrap(), serde_json::json!("second"));
    }

    #[test]
    fn test_http_error_extensions() {
        let error = ResolverError::Http {
            status: 404,
            error: "Not Found".into(),
            message: "no such person".into(),
        }
        .into_graphql_error();

        assert_eq!(error.message, "no such person");
        let source = error.source.as_ref().unwrap();
        assert!(source.downcast_ref::<ResolverError>().is_some());
    }
}
