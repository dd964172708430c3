//! Router errors.
//!
//! [`RouterError`] covers route table and startup failures. [`RouteError`] is
//! a per-request reply rendered as `{statusCode, error, message}`.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Route table, startup and listener failures.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("Route {method} {path} uses unknown auth strategy \"{strategy}\"")]
    UnknownStrategy {
        method: String,
        path: String,
        strategy: String,
    },

    #[error("Pre-start hook failed: {0}")]
    PreStart(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

impl RouterError {
    /// Creates a pre-start failure.
    pub fn pre_start(message: impl fmt::Display) -> Self {
        Self::PreStart(message.to_string())
    }
}

/// Error reply of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RouteError {
    pub status: StatusCode,
    pub message: String,
}

impl RouteError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Canonical reason phrase of the status, e.g. `Unauthorized`.
    pub fn error(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    /// Reply body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status_code: self.status.as_u16(),
            error: self.error().to_string(),
            message: self.message.clone(),
        }
    }

    /// Reply body as JSON.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.body()).unwrap_or(Value::Null)
    }
}

/// Structured error body sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_body() {
        let err = RouteError::unauthorized("Missing authentication");
        assert_eq!(
            err.to_json(),
            json!({"statusCode": 401, "error": "Unauthorized", "message": "Missing authentication"})
        );
        assert_eq!(RouteError::not_found().error(), "Not Found");
    }

    #[test]
    fn test_router_error_display() {
        let err = RouterError::DuplicateRoute {
            method: "GET".into(),
            path: "/health".into(),
        };
        assert_eq!(err.to_string(), "Route GET /health is already registered");
    }
}
