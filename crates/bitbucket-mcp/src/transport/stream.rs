//! Registry of open event streams and the push side of the HTTP transport.
//!
//! Each subscriber owns a bounded channel; the registry keeps the sending
//! half plus the subscriber's keep-alive task. A subscriber whose buffer is
//! full is treated like a failed write and dropped. Dropping a [`StreamSubscription`]
//! (client went away) removes its entry and stops the keep-alive.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use futures::Stream;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::task::JoinHandle;

use crate::types::{error_codes, JSONRPC_VERSION};

/// One unit written to a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// An SSE comment line. Empty for keep-alives.
    Comment(String),
    /// A `message` event.
    Message { id: String, data: String },
}

struct Connection {
    sender: Sender<StreamFrame>,
    keep_alive: Option<JoinHandle<()>>,
}

impl Connection {
    fn shutdown(self) {
        if let Some(task) = self.keep_alive {
            task.abort();
        }
    }
}

/// Frames a subscriber may fall behind by before it is dropped.
pub const DEFAULT_STREAM_BUFFER: usize = 256;

pub struct StreamRegistry {
    connections: DashMap<String, Connection>,
    buffer: usize,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_STREAM_BUFFER)
    }
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `buffer` is clamped to at least 1.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Register a new stream and start its keep-alive timer.
    pub fn open(self: &Arc<Self>, keep_alive: Duration) -> StreamSubscription {
        let id = uuid::Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::channel(self.buffer);

        // Sent before anyone else can see the connection, so it is always first.
        let _ = sender.try_send(StreamFrame::Comment("connected".to_string()));

        let pinger = sender.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(keep_alive);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // A full buffer already has traffic queued; skip this ping.
                if let Err(TrySendError::Closed(_)) =
                    pinger.try_send(StreamFrame::Comment(String::new()))
                {
                    break;
                }
            }
        });

        self.connections.insert(
            id.clone(),
            Connection {
                sender,
                keep_alive: Some(task),
            },
        );
        tracing::info!(connection = %id, "Client connected");

        StreamSubscription {
            id,
            receiver,
            registry: Arc::clone(self),
        }
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub fn close(&self, id: &str) -> bool {
        match self.connections.remove(id) {
            Some((_, connection)) => {
                connection.shutdown();
                tracing::info!(connection = %id, "Client disconnected");
                true
            }
            None => false,
        }
    }

    /// Push `payload` to every open stream. Returns how many streams accepted it.
    /// Streams that are closed or too far behind are removed.
    pub fn broadcast(&self, payload: &Value) -> usize {
        let data = format_envelope(payload).to_string();
        let id = chrono::Utc::now().timestamp_millis().to_string();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for entry in self.connections.iter() {
            let frame = StreamFrame::Message {
                id: id.clone(),
                data: data.clone(),
            };
            match entry.value().sender.try_send(frame) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection = %entry.key(), "Stream buffer full");
                    failed.push(entry.key().clone());
                }
                Err(TrySendError::Closed(_)) => failed.push(entry.key().clone()),
            }
        }

        for id in failed {
            tracing::warn!(connection = %id, "Dropping stream after failed write");
            self.close(&id);
        }

        if delivered == 0 {
            tracing::debug!("No open streams, payload dropped");
        }
        delivered
    }

    /// Close every stream. Subscribers see end-of-stream.
    pub fn close_all(&self) {
        let ids: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.close(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// Receiving side of one stream.
pub struct StreamSubscription {
    id: String,
    receiver: Receiver<StreamFrame>,
    registry: Arc<StreamRegistry>,
}

impl StreamSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Stream for StreamSubscription {
    type Item = StreamFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.registry.close(&self.id);
    }
}

/// Wrap an outgoing payload in a response envelope.
///
/// `id` comes from `payload.id` (else null). A truthy `payload.error` becomes
/// the `error` member, objects verbatim and anything else as a `-32000` error
/// with that message. Otherwise `result` is `payload.result`, or the whole payload.
pub fn format_envelope(payload: &Value) -> Value {
    let id = payload.get("id").cloned().unwrap_or(Value::Null);

    match payload.get("error").filter(|e| is_truthy(e)) {
        Some(error) => {
            let error = match error {
                Value::Object(_) => error.clone(),
                Value::String(message) => json!({ "code": error_codes::SERVER_ERROR, "message": message }),
                other => json!({ "code": error_codes::SERVER_ERROR, "message": other.to_string() }),
            };
            json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error })
        }
        None => {
            let result = payload
                .get("result")
                .filter(|r| !r.is_null())
                .unwrap_or(payload)
                .clone();
            json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
