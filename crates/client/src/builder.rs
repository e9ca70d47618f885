//! Builder pattern for constructing an [`RpcClient`].

use std::time::Duration;

use serde_json::Value;

use crate::callbacks::Callbacks;
use crate::client::{RpcClient, Shared};
use crate::config::{check_address, ClientConfig};
use crate::reconnect::ReconnectPolicy;
use crate::types::ClientError;

/// Fluent builder for [`RpcClient`].
///
/// # Example
///
/// ```rust,no_run
/// # use wsrpc_client::RpcClientBuilder;
/// # async fn demo() -> Result<(), wsrpc_client::ClientError> {
/// let client = RpcClientBuilder::new()
///     .address("ws://127.0.0.1:8080/ws")
///     .reconnect_delay(std::time::Duration::from_secs(3))
///     .on_connected(|| tracing::info!("terminal API up"))
///     .on_event(|method, params| tracing::info!(%method, ?params, "event"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RpcClientBuilder {
    address: String,
    reconnect: ReconnectPolicy,
    flush_pending_on_disconnect: bool,
    request_timeout: Option<Duration>,
    callbacks: Callbacks,
}

impl RpcClientBuilder {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    /// Start from a loaded [`ClientConfig`].  Callbacks stay no-ops.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            address: config.address.clone(),
            reconnect: config.reconnect.clone(),
            flush_pending_on_disconnect: config.flush_pending_on_disconnect,
            request_timeout: config.request_timeout(),
            callbacks: Callbacks::default(),
        }
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Set the peer's WebSocket URL (e.g. `ws://127.0.0.1:8080/ws`).
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Override the fixed reconnect delay (default 3s).
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::fixed(delay);
        self
    }

    // ── Pending requests ─────────────────────────────────────────────

    /// Reject every pending request with `ConnectionReset` when the
    /// connection drops (default: leave them pending).
    pub fn flush_pending_on_disconnect(mut self, flush: bool) -> Self {
        self.flush_pending_on_disconnect = flush;
        self
    }

    /// Reject requests that have not been answered within `timeout`
    /// (default: wait forever).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    // ── Callbacks ────────────────────────────────────────────────────

    /// Replace all three callbacks at once.
    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn on_connected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.on_connected(f);
        self
    }

    pub fn on_disconnected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.on_disconnected(f);
        self
    }

    pub fn on_event(mut self, f: impl Fn(&str, Option<Value>) + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.on_event(f);
        self
    }

    /// Build the [`RpcClient`] and start connecting.
    ///
    /// Must be called from within a tokio runtime; the connection task is
    /// spawned on it.
    pub fn build(self) -> Result<RpcClient, ClientError> {
        check_address(&self.address).map_err(ClientError::Config)?;
        if self.reconnect.delay_ms == 0 {
            return Err(ClientError::Config(
                "reconnect delay must be greater than 0".into(),
            ));
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let shared = Shared::new(
            self.address,
            self.callbacks,
            self.reconnect,
            self.flush_pending_on_disconnect,
            self.request_timeout,
        );
        Ok(RpcClient::start(shared, &runtime))
    }
}

impl Default for RpcClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_websocket_address() {
        let err = RpcClientBuilder::new()
            .address("http://127.0.0.1:8080/ws")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn build_rejects_zero_delay() {
        let err = RpcClientBuilder::new()
            .reconnect_delay(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn build_outside_runtime_fails_cleanly() {
        let err = RpcClientBuilder::new().build().unwrap_err();
        assert!(matches!(err, ClientError::NoRuntime));
    }

    #[tokio::test]
    async fn build_starts_in_connecting_state() {
        // Port 9 (discard) on loopback is never a WebSocket server.
        let client = RpcClientBuilder::new()
            .address("ws://127.0.0.1:9/ws")
            .build()
            .unwrap();
        assert_eq!(client.state(), crate::ConnectionState::Connecting);
        assert_eq!(client.address(), "ws://127.0.0.1:9/ws");
    }

    #[test]
    fn from_config_carries_settings() {
        let config = ClientConfig {
            address: "ws://terminal:8080/ws".into(),
            reconnect: ReconnectPolicy { delay_ms: 750 },
            flush_pending_on_disconnect: true,
            request_timeout_ms: Some(2000),
        };
        let b = RpcClientBuilder::from_config(&config);
        assert_eq!(b.address, "ws://terminal:8080/ws");
        assert_eq!(b.reconnect.delay_ms, 750);
        assert!(b.flush_pending_on_disconnect);
        assert_eq!(b.request_timeout, Some(Duration::from_secs(2)));
    }
}
