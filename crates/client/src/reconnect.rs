//! Reconnect policy: fixed delay, unlimited attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default pause between losing a connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Controls how the client reconnects after a connection drop.
///
/// The delay never grows and there is no attempt limit: the client
/// assumes network loss is transient and keeps retrying for as long as it
/// is alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    /// Delay before every reconnect attempt, in milliseconds.
    #[serde(default = "d_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay_ms: d_delay_ms(),
        }
    }
}

fn d_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay_ms: millis(delay),
        }
    }

    /// Pause before every reconnect attempt.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delay_is_three_seconds() {
        let p = ReconnectPolicy::default();
        assert_eq!(p.delay(), Duration::from_millis(3000));
    }

    #[test]
    fn fixed_delay_round_trips() {
        let p = ReconnectPolicy::fixed(Duration::from_millis(250));
        assert_eq!(p.delay_ms, 250);
        assert_eq!(p.delay(), Duration::from_millis(250));
    }

    #[test]
    fn huge_delay_saturates() {
        let p = ReconnectPolicy::fixed(Duration::MAX);
        assert_eq!(p.delay_ms, u64::MAX);
        assert_eq!(millis(Duration::from_micros(1500)), 1);
    }

    #[test]
    fn deserialize_empty_uses_default() {
        let p: ReconnectPolicy = toml::from_str("").unwrap();
        assert_eq!(p.delay_ms, DEFAULT_RECONNECT_DELAY_MS);
    }
}
