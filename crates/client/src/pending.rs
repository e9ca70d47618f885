//! The deferred result returned by [`RpcClient::request`](crate::RpcClient::request).

use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::correlator::{Correlator, Settlement};
use crate::reconnect::millis;
use crate::types::RpcError;

/// A request's eventual result.
///
/// Resolves with the response's `result`, or rejects with an [`RpcError`].
/// Without a configured request timeout it may stay pending forever (for
/// example when the connection drops before the peer answers).
///
/// Dropping it does not cancel the request; a late response is discarded.
/// With a request timeout configured the entry is still removed at the
/// deadline, whether or not anyone is awaiting it.
#[must_use = "a request's result is only observed by awaiting it"]
pub struct PendingResponse {
    id: Option<u64>,
    rx: oneshot::Receiver<Settlement>,
}

impl PendingResponse {
    /// A result that has already rejected.  No id was allocated.
    pub(crate) fn rejected(err: RpcError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(err));
        Self { id: None, rx }
    }

    pub(crate) fn waiting(id: u64, rx: oneshot::Receiver<Settlement>) -> Self {
        Self { id: Some(id), rx }
    }

    /// The id the request went out with; `None` if it was rejected before
    /// being sent.
    pub fn id(&self) -> Option<u64> {
        self.id
    }
}

impl Future for PendingResponse {
    type Output = Result<Value, RpcError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(settlement)) => Poll::Ready(settlement),
            // Sender dropped without a value: the client is gone.
            Poll::Ready(Err(_)) => Poll::Ready(Err(RpcError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResponse")
            .field("id", &self.id)
            .finish()
    }
}

// ── Request deadline ─────────────────────────────────────────────────

/// Reject request `id` with [`RpcError::Timeout`] once `after` has passed,
/// unless it settled first.
///
/// Runs independently of the [`PendingResponse`], so a dropped handle
/// still has its entry removed.  Holds only a weak reference; a gone
/// client ends the timer with nothing to do.
pub(crate) fn spawn_deadline(
    runtime: &tokio::runtime::Handle,
    correlator: Weak<Correlator>,
    id: u64,
    after: Duration,
) {
    runtime.spawn(async move {
        tokio::time::sleep(after).await;
        let Some(correlator) = correlator.upgrade() else {
            return;
        };
        if correlator.fail(id, RpcError::Timeout { id, after }) {
            tracing::debug!(id, timeout_ms = millis(after), "request timed out");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use wsrpc_protocol::ResponseOutcome;

    #[tokio::test]
    async fn rejected_settles_immediately() {
        let pending = PendingResponse::rejected(RpcError::Disconnected);
        assert_eq!(pending.id(), None);
        assert!(matches!(pending.await, Err(RpcError::Disconnected)));
    }

    #[tokio::test]
    async fn resolves_from_correlator() {
        let correlator = Correlator::new();
        let (id, rx) = correlator.register();
        let pending = PendingResponse::waiting(id, rx);

        correlator.complete(id, ResponseOutcome::Result(json!({"ok": true})));
        assert_eq!(pending.await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_rejects_and_removes_entry() {
        let correlator = Arc::new(Correlator::new());
        let (id, rx) = correlator.register();
        spawn_deadline(
            &tokio::runtime::Handle::current(),
            Arc::downgrade(&correlator),
            id,
            Duration::from_millis(500),
        );

        let err = PendingResponse::waiting(id, rx).await.unwrap_err();
        assert!(matches!(err, RpcError::Timeout { id: 1, .. }));
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_removes_entry_of_dropped_handle() {
        let correlator = Arc::new(Correlator::new());
        for _ in 0..3 {
            let (id, rx) = correlator.register();
            spawn_deadline(
                &tokio::runtime::Handle::current(),
                Arc::downgrade(&correlator),
                id,
                Duration::from_millis(500),
            );
            drop(PendingResponse::waiting(id, rx));
        }
        assert_eq!(correlator.pending_count(), 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(correlator.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn response_before_deadline_wins() {
        let correlator = Arc::new(Correlator::new());
        let (id, rx) = correlator.register();
        spawn_deadline(
            &tokio::runtime::Handle::current(),
            Arc::downgrade(&correlator),
            id,
            Duration::from_secs(5),
        );

        let c = correlator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            c.complete(id, ResponseOutcome::Result(json!("late but in time")));
        });

        assert_eq!(
            PendingResponse::waiting(id, rx).await.unwrap(),
            json!("late but in time")
        );
    }

    #[tokio::test]
    async fn dropped_correlator_reports_closed() {
        let correlator = Correlator::new();
        let (id, rx) = correlator.register();
        let pending = PendingResponse::waiting(id, rx);

        drop(correlator);
        assert!(matches!(pending.await, Err(RpcError::Closed)));
    }
}
