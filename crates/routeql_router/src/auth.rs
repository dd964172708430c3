//! Named authentication strategies.
//!
//! A route guarded by a strategy only reaches its handler when the strategy
//! produces credentials; otherwise the request is answered with the
//! strategy's error (401 "Missing authentication" by default).

use crate::error::RouteError;
use crate::request::RouteRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Produces credentials for a request.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    async fn authenticate(&self, request: &RouteRequest) -> Result<Value, RouteError>;
}

/// Bearer token strategy backed by a static token table.
#[derive(Debug, Clone, Default)]
pub struct BearerTokens {
    tokens: HashMap<String, Value>,
}

impl BearerTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` and authenticates it as `credentials`.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>, credentials: Value) -> Self {
        self.tokens.insert(token.into(), credentials);
        self
    }
}

#[async_trait]
impl AuthStrategy for BearerTokens {
    async fn authenticate(&self, request: &RouteRequest) -> Result<Value, RouteError> {
        let token = request
            .header_value("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| RouteError::unauthorized("Missing authentication"))?;
        self.tokens
            .get(token.trim())
            .cloned()
            .ok_or_else(|| RouteError::unauthorized("Bad token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bearer_tokens() {
        let strategy = BearerTokens::new().token("secret", json!({"user": "ada"}));

        let missing = strategy.authenticate(&RouteRequest::get("/")).await;
        assert_eq!(missing.unwrap_err().message, "Missing authentication");

        let bad = RouteRequest::get("/").header("Authorization", "Bearer nope");
        assert_eq!(strategy.authenticate(&bad).await.unwrap_err().message, "Bad token");

        let good = RouteRequest::get("/").header("Authorization", "Bearer secret");
        assert_eq!(strategy.authenticate(&good).await.unwrap(), json!({"user": "ada"}));
    }
}
