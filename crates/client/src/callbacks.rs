//! Caller-supplied reactions to connection changes and notifications.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type ConnectionFn = Arc<dyn Fn() + Send + Sync>;
type EventFn = Arc<dyn Fn(&str, Option<Value>) + Send + Sync>;

/// The three callbacks a client invokes.  Any callback left unset is a
/// no-op.
///
/// Callbacks run inline on the client's connection task, in frame order,
/// so they should return quickly; hand heavy work off to a channel.
///
/// A callback that needs the client itself must capture a
/// [`WeakRpcClient`](crate::WeakRpcClient), not an
/// [`RpcClient`](crate::RpcClient): the client owns its callbacks, so a
/// strong clone inside one keeps the connection task running forever.
///
/// ```rust
/// # use wsrpc_client::Callbacks;
/// let callbacks = Callbacks::new()
///     .on_connected(|| println!("up"))
///     .on_disconnected(|| println!("down"))
///     .on_event(|method, params| println!("{method}: {params:?}"));
/// ```
#[derive(Clone)]
pub struct Callbacks {
    pub(crate) on_connected: ConnectionFn,
    pub(crate) on_disconnected: ConnectionFn,
    pub(crate) on_event: EventFn,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once per successful connect (including every reconnect).
    pub fn on_connected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connected = Arc::new(f);
        self
    }

    /// Invoked once per connection loss or failed connect attempt.
    pub fn on_disconnected(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnected = Arc::new(f);
        self
    }

    /// Invoked once per notification frame with its `method` and `params`
    /// (`None` when the frame has no `params` key).
    pub fn on_event(mut self, f: impl Fn(&str, Option<Value>) + Send + Sync + 'static) -> Self {
        self.on_event = Arc::new(f);
        self
    }

    pub(crate) fn connected(&self) {
        (self.on_connected)()
    }

    pub(crate) fn disconnected(&self) {
        (self.on_disconnected)()
    }

    pub(crate) fn event(&self, method: &str, params: Option<Value>) {
        (self.on_event)(method, params)
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            on_connected: Arc::new(|| {}),
            on_disconnected: Arc::new(|| {}),
            on_event: Arc::new(|_, _| {}),
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_are_noops() {
        let cb = Callbacks::default();
        cb.connected();
        cb.disconnected();
        cb.event("tick", None);
    }

    #[test]
    fn set_callbacks_fire() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h1 = hits.clone();
        let h2 = hits.clone();
        let cb = Callbacks::new()
            .on_connected(move || {
                h1.fetch_add(1, Ordering::SeqCst);
            })
            .on_event(move |method, params| {
                assert_eq!(method, "tick");
                assert_eq!(params, Some(serde_json::json!({"n": 5})));
                h2.fetch_add(10, Ordering::SeqCst);
            });

        cb.connected();
        cb.event("tick", Some(serde_json::json!({"n": 5})));
        cb.disconnected();
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }
}
