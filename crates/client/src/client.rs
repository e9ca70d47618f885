//! Core client: owns the WebSocket lifecycle (connect, serve, reconnect)
//! and the request entry point.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::{CancellationToken, DropGuard};

use wsrpc_protocol::RequestEnvelope;

use crate::callbacks::Callbacks;
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::pending::{spawn_deadline, PendingResponse};
use crate::reconnect::{millis, ReconnectPolicy};
use crate::types::RpcError;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the connection manager is in its lifecycle.  There is no
/// terminal state: a disconnected client is always about to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// The transport handle.  `outbound` is `Some` exactly while connected.
#[derive(Default)]
struct Link {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

pub(crate) struct Shared {
    pub(crate) address: String,
    pub(crate) callbacks: Callbacks,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) flush_pending_on_disconnect: bool,
    pub(crate) request_timeout: Option<Duration>,
    correlator: Arc<Correlator>,
    link: Mutex<Link>,
}

impl Shared {
    pub(crate) fn new(
        address: String,
        callbacks: Callbacks,
        reconnect: ReconnectPolicy,
        flush_pending_on_disconnect: bool,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            address,
            callbacks,
            reconnect,
            flush_pending_on_disconnect,
            request_timeout,
            correlator: Arc::new(Correlator::new()),
            link: Mutex::new(Link::default()),
        }
    }

    fn set_connecting(&self) {
        let mut link = self.link.lock();
        link.state = ConnectionState::Connecting;
        link.outbound = None;
    }

    fn attach(&self, outbound: mpsc::UnboundedSender<Message>) {
        let mut link = self.link.lock();
        link.state = ConnectionState::Connected;
        link.outbound = Some(outbound);
    }

    fn detach(&self) {
        let mut link = self.link.lock();
        link.state = ConnectionState::Disconnected;
        link.outbound = None;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RpcClient
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A JSON-RPC 2.0 client over one persistent WebSocket that reconnects on
/// its own.
///
/// Create via [`rpc`](crate::rpc) or
/// [`RpcClientBuilder`](crate::builder::RpcClientBuilder).  Cloning is
/// cheap and every clone talks over the same connection.  The background
/// connection task stops once the last clone is dropped.
///
/// A clone captured by one of the client's own callbacks keeps the client
/// alive forever.  Capture a [`WeakRpcClient`] from
/// [`downgrade`](Self::downgrade) instead.
#[derive(Clone)]
pub struct RpcClient {
    shared: Arc<Shared>,
    _lifetime: Arc<DropGuard>,
    runtime: tokio::runtime::Handle,
}

impl RpcClient {
    /// Spawn the connection manager on `runtime` and return the handle.
    /// The first connect attempt starts right away.
    pub(crate) fn start(shared: Shared, runtime: &tokio::runtime::Handle) -> Self {
        shared.set_connecting();
        let shared = Arc::new(shared);
        let shutdown = CancellationToken::new();

        runtime.spawn(run(shared.clone(), shutdown.clone()));

        Self {
            shared,
            _lifetime: Arc::new(shutdown.drop_guard()),
            runtime: runtime.clone(),
        }
    }

    /// Issue a request and return its deferred result.
    ///
    /// While no connection is active the result rejects immediately with
    /// [`RpcError::Disconnected`]: nothing is queued, no id is consumed and
    /// no frame is sent.  Otherwise the next id is allocated, the envelope
    /// is handed to the connection's writer, and the result settles when
    /// the matching response arrives.
    pub fn request(&self, method: impl Into<String>, params: Value) -> PendingResponse {
        let method = method.into();

        // Held across id allocation and hand-off so that ids reach the
        // wire in increasing order.
        let link = self.shared.link.lock();
        let Some(outbound) = link.outbound.as_ref() else {
            tracing::debug!(method = %method, "request rejected: disconnected");
            return PendingResponse::rejected(RpcError::Disconnected);
        };

        let correlator = &self.shared.correlator;
        let (id, rx) = correlator.register();
        let frame = match serde_json::to_string(&RequestEnvelope::new(id, method, params)) {
            Ok(frame) => frame,
            Err(e) => {
                correlator.forget(id);
                return PendingResponse::rejected(RpcError::Encode(e));
            }
        };

        tracing::trace!(id, frame = %frame, "request");
        if outbound.send(Message::Text(frame)).is_err() {
            correlator.forget(id);
            tracing::warn!(id, "request rejected: connection writer is gone");
            return PendingResponse::rejected(RpcError::Transmit { id });
        }

        if let Some(after) = self.shared.request_timeout {
            spawn_deadline(&self.runtime, Arc::downgrade(correlator), id, after);
        }
        PendingResponse::waiting(id, rx)
    }

    /// A handle that does not keep the client alive.
    pub fn downgrade(&self) -> WeakRpcClient {
        WeakRpcClient {
            shared: Arc::downgrade(&self.shared),
            lifetime: Arc::downgrade(&self._lifetime),
            runtime: self.runtime.clone(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.link.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.shared.correlator.pending_count()
    }

    /// Id of the most recently issued request (0 before the first one).
    pub fn last_request_id(&self) -> u64 {
        self.shared.correlator.last_id()
    }

    pub fn address(&self) -> &str {
        &self.shared.address
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("address", &self.shared.address)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Non-owning counterpart of [`RpcClient`], safe to capture in the
/// client's own callbacks.
#[derive(Clone)]
pub struct WeakRpcClient {
    shared: Weak<Shared>,
    lifetime: Weak<DropGuard>,
    runtime: tokio::runtime::Handle,
}

impl WeakRpcClient {
    /// The client, if any strong handle to it still exists.
    pub fn upgrade(&self) -> Option<RpcClient> {
        Some(RpcClient {
            shared: self.shared.upgrade()?,
            _lifetime: self.lifetime.upgrade()?,
            runtime: self.runtime.clone(),
        })
    }
}

impl std::fmt::Debug for WeakRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakRpcClient")
            .field("alive", &(self.lifetime.strong_count() > 0))
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connect, serve until the connection ends, wait, repeat.  Returns only
/// when `shutdown` fires.
async fn run(shared: Arc<Shared>, shutdown: CancellationToken) {
    loop {
        shared.set_connecting();
        tracing::info!(address = %shared.address, "connecting");

        let served = tokio::select! {
            r = connect_and_serve(&shared) => r,
            _ = shutdown.cancelled() => {
                tracing::debug!(address = %shared.address, "client dropped, stopping");
                shared.detach();
                return;
            }
        };

        match served {
            Ok(Session::Closed) => {
                tracing::info!(address = %shared.address, "disconnected");
            }
            Ok(Session::Lost(e)) => {
                tracing::warn!(address = %shared.address, error = %e, "connection lost");
            }
            Err(e) => {
                tracing::warn!(address = %shared.address, error = %e, "connect failed");
            }
        }

        shared.detach();
        if shared.flush_pending_on_disconnect {
            let failed = shared
                .correlator
                .fail_all(|id| RpcError::ConnectionReset { id });
            if failed > 0 {
                tracing::warn!(failed_requests = failed, "failed in-flight requests on disconnect");
            }
        }
        shared.callbacks.disconnected();

        let delay = shared.reconnect.delay();
        tracing::info!(
            address = %shared.address,
            delay_ms = millis(delay),
            "reconnecting"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.cancelled() => return,
        }
    }
}

/// How an established connection ended.
enum Session {
    /// Peer sent a close frame or the stream ended.
    Closed,
    /// Transport error while reading or writing.
    Lost(anyhow::Error),
}

/// Single connection lifecycle: connect → on_connected → read loop.
///
/// `Err` means the connection was never established.
async fn connect_and_serve(shared: &Shared) -> Result<Session, anyhow::Error> {
    let (ws, _response) = tokio_tungstenite::connect_async(shared.address.as_str()).await?;
    Ok(serve(shared, ws).await)
}

async fn serve(shared: &Shared, ws: WsStream) -> Session {
    let (mut sink, mut stream) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: sends queued frames to the WebSocket in order.
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            sink.send(msg).await?;
        }
        Ok::<_, tokio_tungstenite::tungstenite::Error>(())
    });

    shared.attach(outbound_tx);
    tracing::info!(address = %shared.address, "connected");
    shared.callbacks.connected();

    let dispatcher = Dispatcher::new(&shared.correlator, &shared.callbacks);
    let session = loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatcher.dispatch(&text);
                }
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        dispatcher.dispatch(text);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed parsing message: binary frame is not UTF-8");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "peer closed connection");
                    break Session::Closed;
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => break Session::Lost(e.into()),
                None => break Session::Closed,
            },
            written = &mut writer => {
                break match written {
                    Ok(Ok(())) => Session::Closed,
                    Ok(Err(e)) => Session::Lost(e.into()),
                    Err(e) => Session::Lost(anyhow::anyhow!("writer task failed: {e}")),
                };
            }
        }
    };

    shared.detach();
    writer.abort();
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_shared() -> Shared {
        Shared::new(
            "ws://127.0.0.1:9/ws".into(),
            Callbacks::default(),
            ReconnectPolicy::default(),
            false,
            None,
        )
    }

    fn detached_client(shared: Shared) -> RpcClient {
        RpcClient {
            shared: Arc::new(shared),
            _lifetime: Arc::new(CancellationToken::new().drop_guard()),
            runtime: tokio::runtime::Handle::current(),
        }
    }

    #[tokio::test]
    async fn request_while_disconnected_rejects_without_consuming_id() {
        let client = detached_client(test_shared());
        let pending = client.request("x", Value::Null);
        assert_eq!(pending.id(), None);
        assert!(matches!(pending.await, Err(RpcError::Disconnected)));
        assert_eq!(client.last_request_id(), 0);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn request_is_queued_in_wire_format() {
        let shared = test_shared();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared.attach(tx);
        let client = detached_client(shared);

        let first = client.request("ping", json!({}));
        let second = client.request("inlet.open", json!({"slot": 2}));
        assert_eq!(first.id(), Some(1));
        assert_eq!(second.id(), Some(2));
        assert_eq!(client.pending_count(), 2);

        match rx.recv().await {
            Some(Message::Text(text)) => {
                assert_eq!(text, r#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{}}"#)
            }
            other => panic!("expected text frame, got {other:?}"),
        }
        match rx.recv().await {
            Some(Message::Text(text)) => assert!(text.contains(r#""id":2"#)),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dead_writer_rejects_immediately() {
        let shared = test_shared();
        let (tx, rx) = mpsc::unbounded_channel();
        shared.attach(tx);
        drop(rx);
        let client = detached_client(shared);

        let pending = client.request("ping", json!({}));
        assert!(matches!(pending.await, Err(RpcError::Transmit { id: 1 })));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_removes_dropped_requests() {
        let shared = Shared::new(
            "ws://127.0.0.1:9/ws".into(),
            Callbacks::default(),
            ReconnectPolicy::default(),
            false,
            Some(Duration::from_millis(100)),
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        shared.attach(tx);
        let client = detached_client(shared);

        for _ in 0..5 {
            drop(client.request("never", json!({})));
        }
        assert_eq!(client.pending_count(), 5);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn weak_handle_does_not_keep_client_alive() {
        let client = detached_client(test_shared());
        let weak = client.downgrade();

        let upgraded = weak.upgrade().expect("client still alive");
        assert_eq!(upgraded.address(), client.address());
        drop(upgraded);

        drop(client);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn state_follows_link() {
        let shared = test_shared();
        assert_eq!(shared.link.lock().state, ConnectionState::Disconnected);
        shared.set_connecting();
        assert_eq!(shared.link.lock().state, ConnectionState::Connecting);
        let (tx, _rx) = mpsc::unbounded_channel();
        shared.attach(tx);
        assert_eq!(shared.link.lock().state, ConnectionState::Connected);
        shared.detach();
        let link = shared.link.lock();
        assert_eq!(link.state, ConnectionState::Disconnected);
        assert!(link.outbound.is_none());
    }
}
