//! MCP request parameter types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Transport-supplied metadata that travels with a request to the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Value of the `x-api-key` header, if the transport has headers.
    pub api_key: Option<String>,
}

impl RequestContext {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }
}
