//! `wsrpc call`: one request, one answer, then exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use wsrpc_client::{ClientConfig, RpcClientBuilder, RpcError};

use super::parse_params;

/// Connect, send `method` with `params`, and print the result as pretty
/// JSON on stdout.
///
/// `wait` bounds the connect and the response together.  A server error
/// is printed verbatim to stderr and returned as an error so the process
/// exits non-zero.
pub async fn call(
    config: ClientConfig,
    method: String,
    params: Option<String>,
    wait: Duration,
) -> anyhow::Result<()> {
    // Bad params never reach the wire.
    let params = parse_params(params.as_deref())
        .map_err(|e| anyhow::anyhow!("params are not valid JSON: {e}"))?;

    let deadline = Instant::now() + wait;
    let up = Arc::new(Notify::new());
    let notify = up.clone();

    let client = RpcClientBuilder::from_config(&config)
        .on_connected(move || notify.notify_one())
        .build()?;

    tokio::time::timeout_at(deadline, up.notified())
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "not connected to {} within {}ms",
                client.address(),
                wait.as_millis()
            )
        })?;

    let pending = client.request(method.as_str(), params);
    let id = pending.id();
    tracing::debug!(?id, method = %method, "request sent");

    let outcome = tokio::time::timeout_at(deadline, pending)
        .await
        .map_err(|_| anyhow::anyhow!("no response to {method} within {}ms", wait.as_millis()))?;

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(RpcError::Server(payload)) => {
            eprintln!("{}", serde_json::to_string_pretty(&payload)?);
            anyhow::bail!("{method} failed with a server error")
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_params_fail_before_connecting() {
        let config = ClientConfig {
            address: "ws://127.0.0.1:9/ws".into(),
            ..Default::default()
        };
        let err = call(config, "x".into(), Some("{nope".into()), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn unreachable_peer_times_out() {
        let config = ClientConfig {
            address: "ws://127.0.0.1:9/ws".into(),
            ..Default::default()
        };
        let err = call(config, "ping".into(), None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }
}
