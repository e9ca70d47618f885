//! Request correlator: hands out request ids and tracks in-flight requests
//! until their response arrives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use wsrpc_protocol::ResponseOutcome;

use crate::types::RpcError;

pub(crate) type Settlement = Result<Value, RpcError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Correlator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) struct Correlator {
    /// Last id handed out; the first request gets 1.
    last_id: AtomicU64,
    /// Map of request id → completion handle of the waiting caller.
    pending: Mutex<HashMap<u64, oneshot::Sender<Settlement>>>,
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate the next id and record a pending entry for it.
    pub(crate) fn register(&self) -> (u64, oneshot::Receiver<Settlement>) {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        let prev = self.pending.lock().insert(id, tx);
        debug_assert!(prev.is_none(), "request id reused: {id}");
        (id, rx)
    }

    /// Settle the request `id` from a response.  Returns `false` when no
    /// such request is pending (stale or unknown id).
    pub(crate) fn complete(&self, id: u64, outcome: ResponseOutcome) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };
        let settlement = match outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(payload) => Err(RpcError::Server(payload)),
            ResponseOutcome::Empty => Err(RpcError::EmptyResponse { id }),
        };
        // The caller may have dropped its handle; that is not our problem.
        let _ = tx.send(settlement);
        true
    }

    /// Reject the request `id` with `err`.  Returns `false` when it is no
    /// longer pending.
    pub(crate) fn fail(&self, id: u64, err: RpcError) -> bool {
        let Some(tx) = self.pending.lock().remove(&id) else {
            return false;
        };
        let _ = tx.send(Err(err));
        true
    }

    /// Drop the entry for `id` without settling it.
    pub(crate) fn forget(&self, id: u64) -> bool {
        self.pending.lock().remove(&id).is_some()
    }

    /// Reject every pending request.  Returns the number of requests failed.
    pub(crate) fn fail_all(&self, make_error: impl Fn(u64) -> RpcError) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, tx) in drained {
            let _ = tx.send(Err(make_error(id)));
        }
        count
    }

    /// Number of pending (in-flight) requests.
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn last_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }
}
