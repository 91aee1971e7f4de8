//! Main request dispatcher: validates incoming envelopes and routes them to
//! the built-in methods or the tool registry.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bitbucket_client::BitbucketError;
use chrono::{SecondsFormat, Utc};
use futures::FutureExt;
use serde_json::{json, Value};

use crate::tools::ToolRegistry;
use crate::types::*;

use super::auth::AuthGuard;
use super::validator::{parse_envelope, Envelope, Rejection};

/// Built-in methods. Anything else is `Method not found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Ping,
    Initialized,
    Shutdown,
    ToolsList,
    ToolsCall,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "ping" => Some(Method::Ping),
            "notifications/initialized" => Some(Method::Initialized),
            "shutdown" => Some(Method::Shutdown),
            "tools/list" => Some(Method::ToolsList),
            "tools/call" => Some(Method::ToolsCall),
            _ => None,
        }
    }
}

/// Stateless router shared by every transport.
#[derive(Clone)]
pub struct ProtocolHandler {
    tools: Arc<ToolRegistry>,
    auth: AuthGuard,
}

impl ProtocolHandler {
    pub fn new(tools: Arc<ToolRegistry>, auth: AuthGuard) -> Self {
        Self { tools, auth }
    }

    /// Handle one raw message. `None` means nothing must be written back.
    pub async fn handle_message(&self, raw: Value, ctx: &RequestContext) -> Option<Value> {
        match parse_envelope(raw) {
            Ok(Envelope::Request(request)) => Some(self.handle_request(request, ctx).await),
            Ok(Envelope::Notification(notification)) => {
                self.handle_notification(notification);
                None
            }
            Err(Rejection::Silent { reason }) => {
                tracing::warn!("Invalid notification received, ignoring silently: {reason}");
                None
            }
            Err(Rejection::Reply { id, reason }) => {
                tracing::warn!(%id, "Invalid JSON-RPC request: {reason}");
                Some(error_value(McpError::invalid_request(reason), id))
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest, ctx: &RequestContext) -> Value {
        tracing::info!(method = %request.method, id = %request.id, "Handling request");

        let id = request.id.clone();
        match self.dispatch_request(request, ctx).await {
            Ok(result) => serde_json::to_value(JsonRpcResponse::new(id, result)).unwrap_or_default(),
            Err(e) => error_value(e, id),
        }
    }

    async fn dispatch_request(&self, request: JsonRpcRequest, ctx: &RequestContext) -> McpResult<Value> {
        let Some(method) = Method::parse(&request.method) else {
            return Err(McpError::MethodNotFound(request.method));
        };

        match method {
            Method::Initialize => self.handle_initialize(request.params),
            Method::Ping | Method::Shutdown => {
                if method == Method::Shutdown {
                    tracing::info!("Shutdown requested");
                }
                Ok(json!({ "status": "ok", "timestamp": timestamp() }))
            }
            Method::Initialized => Ok(json!({})),
            Method::ToolsList => {
                let result = ToolListResult {
                    tools: self.tools.list(),
                };
                Ok(serde_json::to_value(result)?)
            }
            Method::ToolsCall => self.handle_tools_call(request.params, ctx).await,
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match Method::parse(&notification.method) {
            Some(Method::Initialized) => tracing::info!("Client initialized"),
            _ => tracing::debug!(method = %notification.method, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let params: InitializeParams = params
            .filter(|p| !p.is_null())
            .map(serde_json::from_value)
            .transpose()
            .unwrap_or_else(|e| {
                tracing::debug!("Unparseable initialize params: {e}");
                None
            })
            .unwrap_or_default();

        match &params.client_info {
            Some(client) => tracing::info!(
                client = %client.name,
                version = %client.version,
                protocol = params.protocol_version.as_deref().unwrap_or("unspecified"),
                "Client connected"
            ),
            None => tracing::info!("Client connected without clientInfo"),
        }

        Ok(serde_json::to_value(InitializeResult::default_result())?)
    }

    async fn handle_tools_call(&self, params: Option<Value>, ctx: &RequestContext) -> McpResult<Value> {
        let ToolCallParams { name, arguments } = params
            .filter(Value::is_object)
            .and_then(|p| serde_json::from_value::<ToolCallParams>(p).ok())
            .filter(|p| !p.name.is_empty())
            .ok_or_else(|| {
                McpError::InvalidParams("missing required field 'name' of type string.".to_string())
            })?;

        self.auth.check(ctx.api_key.as_deref())?;

        let handler = self
            .tools
            .resolve(&name)
            .ok_or_else(|| McpError::ToolNotFound(name.clone()))?;

        let arguments = arguments.unwrap_or_else(|| json!({}));

        tracing::info!(tool = %name, "Calling tool");
        let outcome = AssertUnwindSafe(handler.call(arguments)).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result.map_err(classify_tool_error)?,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::error!(tool = %name, "Tool panicked: {detail}");
                return Err(McpError::Internal("Internal server error".to_string()));
            }
        };

        Ok(serde_json::to_value(result)?)
    }
}

/// Errors a tool may raise that already carry their wire meaning pass through;
/// everything else is reported as a tool execution failure.
fn classify_tool_error(e: McpError) -> McpError {
    match e {
        McpError::Bitbucket(ref inner)
            if !matches!(
                inner,
                BitbucketError::Api { .. } | BitbucketError::InvalidInput(_)
            ) =>
        {
            McpError::ToolExecution(inner.to_string())
        }
        McpError::InvalidParams(_)
        | McpError::Bitbucket(_)
        | McpError::ToolExecution(_)
        | McpError::ToolNotFound(_)
        | McpError::Unauthorized
        | McpError::Internal(_) => e,
        other => McpError::ToolExecution(other.to_string()),
    }
}

fn error_value(e: McpError, id: RequestId) -> Value {
    if e.code() == error_codes::SERVER_ERROR {
        tracing::error!(%id, "Request failed: {e}");
    }
    serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
}

/// RFC 3339 UTC with millisecond precision.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
