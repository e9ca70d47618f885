pub mod call;
pub mod config;
pub mod repl;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use wsrpc_client::ClientConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WSRPC_CONFIG";
/// Config file looked up in the working directory when nothing else is set.
pub const DEFAULT_CONFIG_FILE: &str = "wsrpc.toml";

/// wsrpc: talk JSON-RPC 2.0 to a peer over a self-healing WebSocket.
#[derive(Debug, Parser)]
#[command(name = "wsrpc", version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to the config file (default: $WSRPC_CONFIG, then wsrpc.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of compact text.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Peer address for the interactive console; overrides the config file.
    pub address: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive console (default when no subcommand is given).
    Repl {
        /// Peer address, e.g. ws://127.0.0.1:8080/ws.
        address: Option<String>,
    },
    /// Send one request, print its result, and exit.
    Call {
        /// Method name.
        method: String,
        /// Params as JSON (default: null).
        params: Option<String>,
        /// Peer address; overrides the config file.
        #[arg(long)]
        address: Option<String>,
        /// How long to wait for the connection and the response together.
        #[arg(long, default_value_t = 5000)]
        wait_ms: u64,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Pick the config path: the `--config` flag, then `$WSRPC_CONFIG`, then
/// `wsrpc.toml`.  The flag is `true` when the path was asked for
/// explicitly and therefore must exist.
pub fn resolve_config_path(flag: Option<&Path>, env: Option<String>) -> (PathBuf, bool) {
    match (flag, env) {
        (Some(path), _) => (path.to_path_buf(), true),
        (None, Some(path)) if !path.is_empty() => (PathBuf::from(path), true),
        _ => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Load the configuration.  A missing default file yields the built-in
/// defaults; a missing file that was named explicitly is an error.
///
/// Returns the parsed [`ClientConfig`] and the path that was used.
pub fn load_config(flag: Option<&Path>) -> anyhow::Result<(ClientConfig, String)> {
    let (path, explicit) = resolve_config_path(flag, std::env::var(CONFIG_ENV).ok());
    let shown = path.display().to_string();

    let config = if path.exists() {
        ClientConfig::load(&path).map_err(|e| anyhow::anyhow!("loading {shown}: {e}"))?
    } else if explicit {
        anyhow::bail!("config file {shown} does not exist");
    } else {
        tracing::debug!(path = %shown, "no config file, using defaults");
        ClientConfig::default()
    };

    Ok((config, shown))
}

/// Parse request params given on the command line.  Absent params mean
/// JSON `null`.
pub fn parse_params(raw: Option<&str>) -> Result<Value, serde_json::Error> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => serde_json::from_str(text),
        None => Ok(Value::Null),
    }
}
