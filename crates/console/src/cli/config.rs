use wsrpc_client::{ClientConfig, ConfigSeverity};

/// Validate the config, printing any issues and, when it is usable, the
/// connection settings it resolves to.
///
/// Returns `false` when at least one issue is an error.
pub fn validate(config: &ClientConfig, config_path: &str) -> bool {
    let issues = config.validate();
    for issue in &issues {
        println!("{issue}");
    }

    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        println!(
            "\n{config_path}: {errors} error(s), {} warning(s); the client would refuse to start",
            issues.len() - errors
        );
        return false;
    }

    if !issues.is_empty() {
        println!();
    }
    println!("{config_path}: OK");
    print!("{}", summary(config));
    true
}

/// What a client built from `config` will do, one setting per line.
pub fn summary(config: &ClientConfig) -> String {
    let timeout = match config.request_timeout_ms {
        Some(ms) => format!("{ms}ms"),
        None => "none (wait forever)".into(),
    };
    let on_drop = if config.flush_pending_on_disconnect {
        "rejected with ConnectionReset"
    } else {
        "kept pending"
    };
    format!(
        "  peer             {}\n  reconnect every  {}ms\n  request timeout  {timeout}\n  on disconnect    pending requests {on_drop}\n",
        config.address, config.reconnect.delay_ms,
    )
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &ClientConfig) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsrpc_client::ReconnectPolicy;

    #[test]
    fn warnings_alone_pass() {
        let config = ClientConfig {
            request_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(validate(&config, "wsrpc.toml"));
    }

    #[test]
    fn errors_fail() {
        let config = ClientConfig {
            reconnect: ReconnectPolicy { delay_ms: 0 },
            ..Default::default()
        };
        assert!(!validate(&config, "wsrpc.toml"));
    }

    #[test]
    fn summary_of_defaults() {
        let text = summary(&ClientConfig::default());
        assert!(text.contains("peer             ws://127.0.0.1:8080/ws"));
        assert!(text.contains("reconnect every  3000ms"));
        assert!(text.contains("request timeout  none (wait forever)"));
        assert!(text.contains("pending requests kept pending"));
    }

    #[test]
    fn summary_reflects_overrides() {
        let config = ClientConfig {
            address: "wss://terminal.local/ws".into(),
            flush_pending_on_disconnect: true,
            request_timeout_ms: Some(2500),
            reconnect: ReconnectPolicy { delay_ms: 750 },
        };
        let text = summary(&config);
        assert!(text.contains("peer             wss://terminal.local/ws"));
        assert!(text.contains("reconnect every  750ms"));
        assert!(text.contains("request timeout  2500ms"));
        assert!(text.contains("rejected with ConnectionReset"));
        assert_eq!(text.lines().count(), 4);
    }
}
