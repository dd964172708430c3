//! Request execution against an [`ExecutableSchema`].
//!
//! The GraphQL engine parses, validates and executes in one call. A schema
//! extension records whether the request was stopped during parsing or
//! validation so callers can tell protocol failures (which reject the whole
//! request) from field errors (which are part of a normal response).

use crate::builder::ExecutableSchema;
use crate::context::RequestContext;
use async_graphql::extensions::{
    Extension, ExtensionContext, ExtensionFactory, NextParseQuery, NextValidation,
};
use async_graphql::parser::types::ExecutableDocument;
use async_graphql::{ServerError, ServerResult, ValidationResult, Variables};
use futures::stream::BoxStream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A GraphQL request as received over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    fn into_engine_request(self, ctx: RequestContext) -> async_graphql::Request {
        let mut request = async_graphql::Request::new(self.query).data(ctx);
        if let Some(variables) = self.variables {
            request = request.variables(Variables::from_json(variables));
        }
        if let Some(name) = self.operation_name {
            request = request.operation_name(name);
        }
        request
    }
}

/// Phase in which a request was rejected before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Validation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => f.write_str("parse"),
            Self::Validation => f.write_str("validation"),
        }
    }
}

/// A request stopped before any resolver ran.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub phase: Phase,
    pub messages: Vec<String>,
}

impl Rejection {
    /// All diagnostics joined into one message.
    pub fn message(&self) -> String {
        self.messages.join("\n")
    }
}

/// Outcome of [`ExecutableSchema::execute`].
#[derive(Debug)]
pub enum Execution {
    Rejected(Rejection),
    Completed(async_graphql::Response),
}

impl ExecutableSchema {
    /// Executes a query or mutation with `ctx` as the ambient request context.
    pub async fn execute(&self, request: GraphqlRequest, ctx: RequestContext) -> Execution {
        let recorder = Arc::new(PhaseRecorder::default());
        let engine_request = request
            .into_engine_request(ctx)
            .data(Arc::clone(&recorder));
        let response = self.schema.execute(engine_request).await;

        match recorder.rejected() {
            Some(phase) => Execution::Rejected(Rejection {
                phase,
                messages: response.errors.into_iter().map(|e| e.message).collect(),
            }),
            None => Execution::Completed(response),
        }
    }

    /// Executes a subscription operation. Each published event yields one
    /// response; parse and validation failures yield a single error response.
    pub fn execute_stream(
        &self,
        request: GraphqlRequest,
        ctx: RequestContext,
    ) -> BoxStream<'static, async_graphql::Response> {
        Box::pin(self.schema.execute_stream(request.into_engine_request(ctx)))
    }
}

#[derive(Debug, Default)]
struct PhaseRecorder {
    rejected: Mutex<Option<Phase>>,
}

impl PhaseRecorder {
    fn reject(&self, phase: Phase) {
        self.rejected.lock().get_or_insert(phase);
    }

    fn rejected(&self) -> Option<Phase> {
        *self.rejected.lock()
    }
}

/// Schema extension that records parse and validation failures.
pub(crate) struct PhaseGuard;

impl ExtensionFactory for PhaseGuard {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(PhaseGuardExtension)
    }
}

struct PhaseGuardExtension;

impl PhaseGuardExtension {
    fn mark(ctx: &ExtensionContext<'_>, phase: Phase) {
        if let Some(recorder) = ctx.data_opt::<Arc<PhaseRecorder>>() {
            recorder.reject(phase);
        }
    }
}

#[async_trait::async_trait]
impl Extension for PhaseGuardExtension {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let result = next.run(ctx, query, variables).await;
        if result.is_err() {
            Self::mark(ctx, Phase::Parse);
        }
        result
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        let result = next.run(ctx).await;
        if result.is_err() {
            Self::mark(ctx, Phase::Validation);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverMap;
    use serde_json::json;

    fn hello_schema() -> ExecutableSchema {
        let mut resolvers = ResolverMap::new();
        resolvers.register_fn("Query", "hello", |_, args, _, _| {
            let name = args.get_as::<String>("name").unwrap_or_else(|| "world".into());
            Ok(json!(format!("hello {name}")))
        });
        ExecutableSchema::from_sdl("type Query { hello(name: String): String }", resolvers).unwrap()
    }

    #[tokio::test]
    async fn test_parse_errors_are_rejected() {
        let execution = hello_schema()
            .execute(GraphqlRequest::new("{ hello "), RequestContext::new())
            .await;
        let Execution::Rejected(rejection) = execution else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.phase, Phase::Parse);
        assert!(!rejection.message().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors_are_rejected() {
        let execution = hello_schema()
            .execute(
                GraphqlRequest::new("{ hello @notThere missing }"),
                RequestContext::new(),
            )
            .await;
        let Execution::Rejected(rejection) = execution else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.phase, Phase::Validation);
        assert!(rejection.message().contains("Unknown directive"));
    }

    #[tokio::test]
    async fn test_variables_and_operation_name() {
        let request = GraphqlRequest::new(
            "query A($n: String) { hello(name: $n) } query B { hello }",
        )
        .with_variables(json!({"n": "ada"}))
        .with_operation_name("A");

        let Execution::Completed(response) =
            hello_schema().execute(request, RequestContext::new()).await
        else {
            panic!("expected completion");
        };
        assert!(response.errors.is_empty());
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"hello": "hello ada"})
        );
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let request: GraphqlRequest = serde_json::from_value(json!({
            "query": "{ hello }",
            "operationName": "Q"
        }))
        .unwrap();
        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert!(request.variables.is_none());
    }
}
