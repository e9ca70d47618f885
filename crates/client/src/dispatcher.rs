//! Message dispatcher: routes each inbound frame to the event callback or
//! to the pending request it answers.

use wsrpc_protocol::Inbound;

use crate::callbacks::Callbacks;
use crate::correlator::Correlator;

/// What happened to a dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatched {
    /// Notification handed to `on_event`.
    Event,
    /// Response settled a pending request.
    Settled,
    /// Response for an id that is not pending.
    Unmatched,
    /// Well-formed but of no recognized shape.
    Ignored,
    /// Not valid JSON.
    Malformed,
}

pub(crate) struct Dispatcher<'a> {
    correlator: &'a Correlator,
    callbacks: &'a Callbacks,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(correlator: &'a Correlator, callbacks: &'a Callbacks) -> Self {
        Self {
            correlator,
            callbacks,
        }
    }

    /// Handle one inbound text frame.  Never fails: malformed frames are
    /// logged and dropped.
    pub(crate) fn dispatch(&self, frame: &str) -> Dispatched {
        let inbound = match Inbound::parse(frame) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::error!(error = %e, frame = %frame, "failed parsing message");
                return Dispatched::Malformed;
            }
        };

        match inbound {
            Inbound::Notification { method, params } => {
                tracing::debug!(method = %method, "event");
                self.callbacks.event(&method, params);
                Dispatched::Event
            }
            Inbound::Response { id, outcome } => {
                if self.correlator.complete(id, outcome) {
                    tracing::debug!(id, "response");
                    Dispatched::Settled
                } else {
                    tracing::trace!(id, "response for unknown request");
                    Dispatched::Unmatched
                }
            }
            Inbound::Ignored => {
                tracing::trace!(frame = %frame, "ignoring frame");
                Dispatched::Ignored
            }
        }
    }
}
