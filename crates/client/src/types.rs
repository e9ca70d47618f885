//! Error types: per-request outcomes and client construction failures.

use std::time::Duration;

use serde_json::Value;
use wsrpc_protocol::JsonRpcErrorObject;

/// Why a single request's deferred result rejected.
///
/// Every variant is local to the request it settles; none of them stops
/// the client.
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    /// Issued while no connection was active.  Nothing was sent.
    #[error("disconnected")]
    Disconnected,
    /// The connection's writer went away between the state check and the
    /// hand-off of the frame.
    #[error("failed to transmit request {id}: connection writer is gone")]
    Transmit { id: u64 },
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The peer answered with an `error` payload, kept verbatim.
    #[error("server error: {0}")]
    Server(Value),
    /// The peer answered with neither `result` nor `error`.
    #[error("response {id} carried neither result nor error")]
    EmptyResponse { id: u64 },
    /// Only produced when `flush_pending_on_disconnect` is enabled.
    #[error("connection reset before response {id} arrived")]
    ConnectionReset { id: u64 },
    /// Only produced when a request timeout is configured.
    #[error("request {id} timed out after {}ms", .after.as_millis())]
    Timeout { id: u64, after: Duration },
    /// The client and its connection manager are gone.
    #[error("client shut down")]
    Closed,
}

impl RpcError {
    /// The server payload as a standard `{code, message, data}` object,
    /// when it has that shape.
    pub fn server_error(&self) -> Option<JsonRpcErrorObject> {
        match self {
            RpcError::Server(payload) => JsonRpcErrorObject::from_payload(payload),
            _ => None,
        }
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, RpcError::Disconnected)
    }
}

/// Failure to construct a client or load its configuration.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("config: {0}")]
    Config(String),
    #[error("no tokio runtime: clients must be created from within a runtime")]
    NoRuntime,
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),
}
