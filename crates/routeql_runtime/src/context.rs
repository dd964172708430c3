//! Request-scoped and resolver-scoped context.
//!
//! [`TypedContext`] is a `TypeId`-keyed store used both as the auxiliary
//! context produced by a pre-resolve hook and as the typed part of the
//! per-request [`RequestContext`].

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-safe storage for scoped data.
///
/// Values are stored behind `Arc`, so cloning a context is cheap and clones
/// share the stored values.
///
/// # Example
///
/// ```
/// use routeql_runtime::context::TypedContext;
///
/// #[derive(Clone)]
/// struct TenantId(String);
///
/// let mut ctx = TypedContext::new();
/// ctx.insert(TenantId("acme".into()));
///
/// let tenant: Option<&TenantId> = ctx.get();
/// assert_eq!(tenant.unwrap().0, "acme");
/// ```
#[derive(Default, Clone)]
pub struct TypedContext {
    data: FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TypedContext {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value into the context, replacing any value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.data.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Gets a reference to a value by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|stored| stored.downcast_ref())
    }

    /// Removes a value by type. Returns true if a value was present.
    pub fn remove<T: 'static>(&mut self) -> bool {
        self.data.remove(&TypeId::of::<T>()).is_some()
    }

    /// Returns true if the context contains a value of the given type.
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for TypedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedContext")
            .field("data_count", &self.data.len())
            .finish()
    }
}

/// The auxiliary context handed to resolvers as their first parameter.
///
/// Empty unless a pre-resolve hook is configured.
pub type AuxContext = TypedContext;

/// Per-request ambient context made available to every resolver.
///
/// Header names are stored lowercased.
#[derive(Default, Clone)]
pub struct RequestContext {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    credentials: Option<serde_json::Value>,
    typed: TypedContext,
}

impl RequestContext {
    /// Creates a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method of the originating request.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the path of the originating request.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the authenticated credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: serde_json::Value) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Adds a header and returns self.
    #[must_use]
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Adds a typed value and returns self.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.typed.insert(value);
        self
    }

    /// HTTP method of the originating request.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path of the originating request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Credentials produced by the route's auth strategy, if any.
    pub fn credentials(&self) -> Option<&serde_json::Value> {
        self.credentials.as_ref()
    }

    /// Sets a header value.
    pub fn set_header(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Gets a header value, case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns all headers.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Inserts a typed value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.typed.insert(value);
    }

    /// Gets a typed value.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.typed.get()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("authenticated", &self.credentials.is_some())
            .field("data_count", &self.typed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct UserId(String);

    #[test]
    fn test_typed_context() {
        let mut ctx = TypedContext::new();
        ctx.insert(UserId("123".into()));
        assert_eq!(ctx.get::<UserId>(), Some(&UserId("123".into())));
        assert!(ctx.get::<String>().is_none());

        let copy = ctx.clone();
        assert!(ctx.remove::<UserId>());
        assert!(!ctx.contains::<UserId>());
        assert!(copy.contains::<UserId>());
    }

    #[test]
    fn test_request_context_headers() {
        let ctx = RequestContext::new()
            .with_method("POST")
            .with_path("/graphql")
            .with_header("Authorization", "Bearer abc");

        assert_eq!(ctx.method(), "POST");
        assert_eq!(ctx.header("authorization"), Some("Bearer abc"));
        assert_eq!(ctx.header("AUTHORIZATION"), Some("Bearer abc"));
        assert!(ctx.credentials().is_none());
    }
}
