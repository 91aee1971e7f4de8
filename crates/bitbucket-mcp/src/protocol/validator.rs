//! Envelope validation: decides whether raw JSON is a request, a notification,
//! or something to reject, before any routing happens.

use serde_json::Value;

use crate::types::{JsonRpcNotification, JsonRpcRequest, RequestId, JSONRPC_VERSION};

/// A well-formed incoming message.
#[derive(Debug, Clone)]
pub enum Envelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Why a message was not accepted, and whether it can be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// No usable id: drop without a reply.
    Silent { reason: String },
    /// Answer with `-32600` using this id.
    Reply { id: RequestId, reason: String },
}

pub fn parse_envelope(raw: Value) -> Result<Envelope, Rejection> {
    let Value::Object(mut obj) = raw else {
        return Err(Rejection::Silent {
            reason: "message is not a JSON object".to_string(),
        });
    };

    let id = match obj.remove("id") {
        None => None,
        Some(raw_id) => match serde_json::from_value::<RequestId>(raw_id) {
            Ok(id) => Some(id),
            Err(_) => {
                return Err(Rejection::Reply {
                    id: RequestId::Null,
                    reason: "id must be a string, a number or null".to_string(),
                })
            }
        },
    };

    let reject = |reason: String| match &id {
        Some(id) => Rejection::Reply {
            id: id.clone(),
            reason,
        },
        None => Rejection::Silent { reason },
    };

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        other => {
            return Err(reject(format!(
                "expected jsonrpc \"{JSONRPC_VERSION}\", got {}",
                other.map_or_else(|| "nothing".to_string(), |v| format!("\"{v}\""))
            )))
        }
    }

    let method = match obj.get("method").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => return Err(reject("method must be a non-empty string".to_string())),
    };

    let params = obj.remove("params");

    Ok(match id {
        Some(id) => Envelope::Request(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method,
            params,
        }),
        None => Envelope::Notification(JsonRpcNotification::new(method, params)),
    })
}
