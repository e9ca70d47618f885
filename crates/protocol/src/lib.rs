//! Wire envelopes for JSON-RPC 2.0 over a message-oriented transport.
//!
//! Every WebSocket text message carries exactly one JSON object.  The client
//! sends requests; the peer sends back responses (matched by `id`) and
//! unsolicited notifications (no `id`).
//!
//! Inbound frames are classified by shape rather than by strict schema so
//! that peers which omit `jsonrpc` or send extra keys still interoperate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version string carried in every outgoing envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSON-RPC 2.0 request (has an `id`, expects a response).
///
/// `params` is always serialized, as `null` when the caller has none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RequestEnvelope {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// Peer → client notification.  Used by peers and test doubles.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationEnvelope {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl NotificationEnvelope {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

/// Peer → client response.  Exactly one of `result` / `error` is set by the
/// constructors; `Some(Value::Null)` serializes as `"result":null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponseEnvelope {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A standard JSON-RPC 2.0 error object.
///
/// Servers are free to put anything in `error`; this is only the common
/// shape, recovered on demand from the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    /// Interpret an arbitrary `error` payload as a standard error object.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

impl std::fmt::Display for JsonRpcErrorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorObject {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a response envelope says about its request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// `result` key present (its value may be `null`).
    Result(Value),
    /// No `result` key, `error` key present.  Payload kept verbatim.
    Error(Value),
    /// Neither key present.
    Empty,
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// No `id`, has `method`.  `params` is `None` when the key is absent.
    Notification {
        method: String,
        params: Option<Value>,
    },
    /// Has `id`, no `method`.
    Response { id: u64, outcome: ResponseOutcome },
    /// Any other shape: both `id` and `method`, neither, a non-object
    /// frame, or an `id` that cannot have been issued by this client.
    Ignored,
}

impl Inbound {
    /// Parse a raw text frame and classify it.
    ///
    /// Only invalid JSON is an error; every well-formed frame classifies.
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(frame)?;
        Ok(Self::classify(value))
    }

    /// Classify an already-parsed JSON value.
    ///
    /// An explicit `null` for `id` or `method` counts as absent.
    pub fn classify(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Inbound::Ignored;
        };

        let id = obj.remove("id").filter(|v| !v.is_null());
        let method = obj.remove("method").filter(|v| !v.is_null());

        match (id, method) {
            (None, Some(Value::String(method))) => Inbound::Notification {
                method,
                params: obj.remove("params"),
            },
            (Some(id), None) => match id.as_u64() {
                Some(id) => Inbound::Response {
                    id,
                    outcome: take_outcome(&mut obj),
                },
                None => Inbound::Ignored,
            },
            _ => Inbound::Ignored,
        }
    }
}

fn take_outcome(obj: &mut Map<String, Value>) -> ResponseOutcome {
    if let Some(result) = obj.remove("result") {
        ResponseOutcome::Result(result)
    } else if let Some(error) = obj.remove("error") {
        ResponseOutcome::Error(error)
    } else {
        ResponseOutcome::Empty
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
