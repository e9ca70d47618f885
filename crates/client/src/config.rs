//! Client configuration, loadable from TOML.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconnect::ReconnectPolicy;
use crate::types::ClientError;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything needed to build an [`RpcClient`](crate::RpcClient) except
/// the callbacks.
///
/// ```toml
/// address = "ws://127.0.0.1:8080/ws"
/// flush_pending_on_disconnect = false
/// request_timeout_ms = 30000
///
/// [reconnect]
/// delay_ms = 3000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket URL of the peer (`ws://` or `wss://`).
    #[serde(default = "d_address")]
    pub address: String,

    /// Reject every pending request with `ConnectionReset` when the
    /// connection drops.  When `false`, pending requests stay pending
    /// across reconnects.
    #[serde(default)]
    pub flush_pending_on_disconnect: bool,

    /// Per-request timeout.  Unset means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: d_address(),
            flush_pending_on_disconnect: false,
            request_timeout_ms: None,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

fn d_address() -> String {
    "ws://127.0.0.1:8080/ws".into()
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// Check that an address is a WebSocket URL this client can dial.
pub(crate) fn check_address(address: &str) -> Result<(), String> {
    if address.is_empty() {
        return Err("address must not be empty".into());
    }
    let rest = address
        .strip_prefix("ws://")
        .or_else(|| address.strip_prefix("wss://"))
        .ok_or_else(|| format!("address must start with ws:// or wss:// (got {address:?})"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("address has no host (got {address:?})"));
    }
    Ok(())
}

impl ClientConfig {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Err(message) = check_address(&self.address) {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "address".into(),
                message,
            });
        }

        // A zero delay turns an unreachable peer into a busy loop.
        if self.reconnect.delay_ms == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "reconnect.delay_ms".into(),
                message: "delay must be greater than 0".into(),
            });
        }

        if self.request_timeout_ms == Some(0) {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "request_timeout_ms".into(),
                message: "a zero timeout rejects every request before a response can arrive"
                    .into(),
            });
        }

        issues
    }

    pub fn has_errors(&self) -> bool {
        self.validate()
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_empty());
    }

    #[test]
    fn address_checks() {
        assert!(check_address("ws://127.0.0.1:8080/ws").is_ok());
        assert!(check_address("wss://terminal.local/ws").is_ok());
        assert!(check_address("").is_err());
        assert!(check_address("http://127.0.0.1:8080/ws").is_err());
        assert!(check_address("ws://").is_err());
        assert!(check_address("ws:///ws").is_err());
    }

    #[test]
    fn bad_address_is_an_error() {
        let cfg = ClientConfig {
            address: "tcp://nowhere".into(),
            ..Default::default()
        };
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Error);
        assert_eq!(issues[0].field, "address");
        assert!(cfg.has_errors());
    }

    #[test]
    fn zero_delay_is_an_error() {
        let cfg = ClientConfig {
            reconnect: ReconnectPolicy { delay_ms: 0 },
            ..Default::default()
        };
        assert!(cfg.has_errors());
    }

    #[test]
    fn zero_timeout_is_only_a_warning() {
        let cfg = ClientConfig {
            request_timeout_ms: Some(0),
            ..Default::default()
        };
        let issues = cfg.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, ConfigSeverity::Warning);
        assert!(!cfg.has_errors());
    }

    #[test]
    fn issue_display() {
        let issue = ConfigIssue {
            severity: ConfigSeverity::Warning,
            field: "request_timeout_ms".into(),
            message: "too small".into(),
        };
        assert_eq!(issue.to_string(), "[WARN] request_timeout_ms: too small");
    }

    #[test]
    fn request_timeout_conversion() {
        let cfg = ClientConfig {
            request_timeout_ms: Some(1500),
            ..Default::default()
        };
        assert_eq!(cfg.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(ClientConfig::default().request_timeout(), None);
    }
}
