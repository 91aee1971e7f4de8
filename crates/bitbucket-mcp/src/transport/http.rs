//! HTTP transport: JSON-RPC over POST, server push over SSE, and `/health`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::protocol::{ProtocolHandler, API_KEY_HEADER};
use crate::types::{McpError, McpResult, RequestContext, RequestId};

use super::stream::{StreamFrame, StreamRegistry};

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    pub handler: ProtocolHandler,
    pub streams: Arc<StreamRegistry>,
    pub keep_alive: Duration,
}

pub struct HttpTransport {
    state: Arc<ServerState>,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(handler: ProtocolHandler, endpoint: impl Into<String>, keep_alive: Duration) -> Self {
        Self {
            state: Arc::new(ServerState {
                handler,
                streams: Arc::new(StreamRegistry::new()),
                keep_alive,
            }),
            endpoint: endpoint.into(),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handle_health))
            .route(&self.endpoint, post(handle_post).get(handle_stream))
            .layer(cors)
            .with_state(self.state.clone())
    }

    pub fn streams(&self) -> &Arc<StreamRegistry> {
        &self.state.streams
    }

    /// Push a payload to every open stream. Returns the number of deliveries.
    pub fn send(&self, payload: &Value) -> usize {
        self.state.streams.broadcast(payload)
    }

    /// Serve on `addr` until Ctrl-C.
    pub async fn run(&self, addr: SocketAddr) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on http://{addr}{}", self.endpoint);

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await
    }

    /// Serve on an already-bound listener until `shutdown` completes. Open
    /// streams are closed first so in-flight SSE responses can finish.
    pub async fn serve<F>(&self, listener: tokio::net::TcpListener, shutdown: F) -> McpResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let streams = Arc::clone(&self.state.streams);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                streams.close_all();
            })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

async fn handle_post(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Rejected POST body: {e}");
            let error = McpError::ParseError(e.to_string()).to_json_rpc_error(RequestId::Null);
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };

    let ctx = RequestContext {
        api_key: headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    match state.handler.handle_message(raw, &ctx).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn handle_stream(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.streams.open(state.keep_alive);
    Sse::new(subscription.map(|frame| Ok(to_event(frame))))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn to_event(frame: StreamFrame) -> Event {
    match frame {
        StreamFrame::Comment(text) => Event::default().comment(text),
        StreamFrame::Message { id, data } => Event::default().id(id).event("message").data(data),
    }
}
