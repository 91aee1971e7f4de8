//! Error types and JSON-RPC error codes for the MCP server.

use bitbucket_client::BitbucketError;

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server-defined: anything that escaped classification.
    pub const SERVER_ERROR: i32 = -32000;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    /// Only produced for HTTP bodies; a pipe line that fails to parse has no id to answer.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The wire message is fixed; `reason` is for logs.
    #[error("Invalid JSON-RPC request.")]
    InvalidRequest { reason: String },

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Authentication failed: Invalid or missing API key.")]
    Unauthorized,

    #[error(transparent)]
    Bitbucket(#[from] BitbucketError),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("{0}")]
    Internal(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        McpError::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest { .. } => INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::Bitbucket(e) if e.is_invalid_input() => INVALID_PARAMS,
            McpError::Bitbucket(_) | McpError::ToolExecution(_) | McpError::Unauthorized => {
                INTERNAL_ERROR
            }
            McpError::Internal(_)
            | McpError::DuplicateTool(_)
            | McpError::Config(_)
            | McpError::Transport(_)
            | McpError::Io(_)
            | McpError::Json(_) => SERVER_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: None,
            },
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
