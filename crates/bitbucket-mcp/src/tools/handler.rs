//! Tool handlers and the argument-validating wrapper every tool goes through.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{McpError, McpResult, ToolCallResult};

/// Something the dispatcher can invoke with raw JSON arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> McpResult<ToolCallResult>;
}

/// Parses arguments into `A` before running the operation, so the operation
/// only ever sees well-formed input.
pub struct ValidatedHandler<A, F> {
    tool: String,
    operation: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F> ValidatedHandler<A, F> {
    pub fn new(tool: impl Into<String>, operation: F) -> Self {
        Self {
            tool: tool.into(),
            operation,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, Fut> ToolHandler for ValidatedHandler<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = McpResult<ToolCallResult>> + Send,
{
    async fn call(&self, arguments: Value) -> McpResult<ToolCallResult> {
        // Derived struct impls would also accept a positional array.
        if !arguments.is_object() {
            tracing::warn!(tool = %self.tool, args = %arguments, "Tool arguments are not an object");
            return Err(McpError::InvalidParams("arguments must be an object".to_string()));
        }

        let parsed: A = serde::Deserialize::deserialize(&arguments).map_err(|e| {
            tracing::warn!(tool = %self.tool, args = %arguments, "Invalid tool arguments: {e}");
            McpError::InvalidParams(e.to_string())
        })?;

        (self.operation)(parsed).await.map_err(|e| {
            tracing::error!(tool = %self.tool, args = %arguments, "Tool failed: {e}");
            e
        })
    }
}

/// Box a [`ValidatedHandler`] for the registry.
pub fn validated<A, F, Fut>(tool: &str, operation: F) -> Arc<dyn ToolHandler>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = McpResult<ToolCallResult>> + Send + 'static,
{
    Arc::new(ValidatedHandler::new(tool, operation))
}
