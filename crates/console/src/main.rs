use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wsrpc_console::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_flag = cli.config.as_deref();
    let log_json = cli.log_json;

    match cli.command {
        // Default to the console when no subcommand is given.
        None => {
            init_cli_tracing(log_json);
            let (mut config, _) = cli::load_config(config_flag)?;
            if let Some(address) = cli.address {
                config.address = address;
            }
            cli::repl::repl(config).await
        }
        Some(Command::Repl { address }) => {
            init_cli_tracing(log_json);
            let (mut config, _) = cli::load_config(config_flag)?;
            if let Some(address) = address {
                config.address = address;
            }
            cli::repl::repl(config).await
        }
        Some(Command::Call {
            method,
            params,
            address,
            wait_ms,
        }) => {
            init_cli_tracing(log_json);
            let (mut config, _) = cli::load_config(config_flag)?;
            if let Some(address) = address {
                config.address = address;
            }
            cli::call::call(config, method, params, Duration::from_millis(wait_ms)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config(config_flag)?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config(config_flag)?;
            cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("wsrpc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Tracing to stderr so stdout stays clean for results: compact by
/// default, JSON with `--log-json`.  Defaults to `warn`; override with
/// `RUST_LOG`.
fn init_cli_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
