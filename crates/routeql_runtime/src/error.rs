//! Typed error system for routeql.
//!
//! Configuration and dependency problems are reported at build or
//! registration time through [`RouteqlError`]. Field-level failures raised by
//! resolvers use [`crate::resolver::ResolverError`] instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Typed error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // Build/registration errors
    ConfigurationError,
    DependencyError,
    SchemaError,
    MergeConflict,

    // Request errors
    ParseError,
    ValidationError,
    VariablesError,
    NoSchema,

    // Execution errors
    ExecutionError,
    ResolverError,

    // Channel errors
    ChannelError,

    // Auth errors
    Unauthorized,

    // Resource errors
    NotFound,

    // Internal errors
    InternalError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::DependencyError => "DEPENDENCY_ERROR",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::MergeConflict => "MERGE_CONFLICT",
            Self::ParseError => "PARSE_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::VariablesError => "VARIABLES_ERROR",
            Self::NoSchema => "NO_SCHEMA",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::ResolverError => "RESOLVER_ERROR",
            Self::ChannelError => "CHANNEL_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is raised while building or registering a
    /// schema rather than while serving a request.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError | Self::DependencyError | Self::SchemaError | Self::MergeConflict
        )
    }

    /// Returns true if this is a client error (4xx equivalent).
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ParseError
                | Self::ValidationError
                | Self::VariablesError
                | Self::Unauthorized
                | Self::NotFound
        )
    }

    /// Returns true if this is a server error (5xx equivalent).
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::InternalError | Self::ExecutionError | Self::ResolverError | Self::NoSchema
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by schema building, registration and publishing.
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct RouteqlError {
    /// Typed error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Extension data for debugging.
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

impl RouteqlError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extensions: None,
        }
    }

    /// Adds extension data.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let extensions = self.extensions.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            extensions.insert(key.into(), v);
        }
        self
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    /// Creates a dependency error.
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DependencyError, message)
    }

    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaError, message)
    }

    /// Creates a merge conflict error.
    pub fn merge_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MergeConflict, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Creates a variables error.
    pub fn variables(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::VariablesError, message)
    }

    /// Creates a channel error.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ChannelError, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{resource} not found"))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Returns true if this error was raised at build or registration time.
    pub fn is_configuration_error(&self) -> bool {
        self.code.is_configuration_error()
    }

    /// Returns true if this is a client error.
    pub fn is_client_error(&self) -> bool {
        self.code.is_client_error()
    }

    /// Returns true if this is a server error.
    pub fn is_server_error(&self) -> bool {
        self.code.is_server_error()
    }
}

impl Serialize for RouteqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("RouteqlError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref ext) = self.extensions {
            state.serialize_field("extensions", ext)?;
        }
        state.end()
    }
}

/// Type alias for routeql results.
pub type RouteqlResult<T> = std::result::Result<T, RouteqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_properties() {
        assert!(ErrorCode::ConfigurationError.is_configuration_error());
        assert!(ErrorCode::MergeConflict.is_configuration_error());
        assert!(!ErrorCode::ParseError.is_configuration_error());

        assert!(ErrorCode::VariablesError.is_client_error());
        assert!(!ErrorCode::InternalError.is_client_error());

        assert!(ErrorCode::NoSchema.is_server_error());
        assert!(!ErrorCode::NotFound.is_server_error());
    }

    #[test]
    fn test_error_display() {
        let err = RouteqlError::configuration("Type \"Ghost\" does not exist in the schema");
        assert_eq!(
            err.to_string(),
            "[CONFIGURATION_ERROR] Type \"Ghost\" does not exist in the schema"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = RouteqlError::dependency("realtime transport missing")
            .with_extension("subscription", "personCreated");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "DEPENDENCY_ERROR");
        assert_eq!(json["extensions"]["subscription"], "personCreated");
    }
}
