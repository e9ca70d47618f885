//! `wsrpc-client`: resilient JSON-RPC 2.0 client over one WebSocket.
//!
//! The client keeps a single persistent connection to a peer, lets callers
//! issue request/response calls, forwards unsolicited notifications to a
//! callback, and reconnects on its own after any connection loss.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RpcClient::request(method, params) ──► Correlator           │
//! │        (id++, pending[id] = handle)     │                    │
//! │                                         ▼                    │
//! │  connection task ◄── writer task ◄── outbound queue          │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  Dispatcher ──► pending[id].settle(result | error)           │
//! │             └─► on_event(method, params)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Connection lifecycle
//!
//! 1. Connect to the address; on success call `on_connected`
//! 2. Dispatch every inbound frame, in arrival order
//! 3. On close, error, or failed connect: call `on_disconnected`
//! 4. Wait the fixed reconnect delay (3s by default) and go to 1, forever
//!
//! Requests issued while not connected reject at once with
//! [`RpcError::Disconnected`]; nothing is queued for later.  Requests still
//! pending when a connection drops stay pending unless
//! `flush_pending_on_disconnect` is enabled.
//!
//! # Usage
//!
//! ```rust,no_run
//! use wsrpc_client::{rpc, Callbacks};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = rpc(
//!     "ws://127.0.0.1:8080/ws",
//!     Callbacks::new().on_event(|method, params| println!("{method} {params:?}")),
//! )?;
//!
//! let reply = client.request("inlet.open", json!({})).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod callbacks;
pub mod client;
pub mod config;
mod correlator;
mod dispatcher;
pub mod pending;
pub mod reconnect;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::RpcClientBuilder;
pub use callbacks::Callbacks;
pub use client::{ConnectionState, RpcClient, WeakRpcClient};
pub use config::{ClientConfig, ConfigIssue, ConfigSeverity};
pub use pending::PendingResponse;
pub use reconnect::{ReconnectPolicy, DEFAULT_RECONNECT_DELAY_MS};
pub use types::{ClientError, RpcError};

pub use wsrpc_protocol::JsonRpcErrorObject;

/// Create a client for `address` with the given callbacks and default
/// settings.  Connecting starts immediately.
///
/// Every call produces an independent client with its own connection and
/// request ids.  Must be called from within a tokio runtime.
pub fn rpc(address: impl Into<String>, callbacks: Callbacks) -> Result<RpcClient, ClientError> {
    RpcClientBuilder::new()
        .address(address)
        .callbacks(callbacks)
        .build()
}
