//! `wsrpc repl`: interactive console.
//!
//! Each line is `method [json-params]` and goes out as one request; the
//! answer is printed whenever it arrives, so several requests can be in
//! flight at once.  Notifications and connection changes are printed as
//! they happen.

use serde_json::Value;
use wsrpc_client::{ClientConfig, RpcClient, RpcClientBuilder, RpcError};

use super::parse_params;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive console until `/exit` or Ctrl+D.
pub async fn repl(config: ClientConfig) -> anyhow::Result<()> {
    let client = RpcClientBuilder::from_config(&config)
        .on_connected(|| eprintln!("[connected]"))
        .on_disconnected(|| eprintln!("[disconnected]"))
        .on_event(|method, params| println!("{}", format_event(method, params.as_ref())))
        .build()?;

    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".wsrpc")
        .join("history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    eprintln!("wsrpc console: {}", client.address());
    eprintln!("Type `method [json-params]`, /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        // Readline blocks; keep the runtime's other workers free for the
        // connection task.
        let readline = tokio::task::block_in_place(|| rl.readline("rpc> "));

        match readline {
            Ok(line) => {
                let input = match parse_line(&line) {
                    Ok(Input::Empty) => continue,
                    Ok(input) => input,
                    Err(e) => {
                        rl.add_history_entry(&line).ok();
                        eprintln!("\x1B[31merror: {e}\x1B[0m");
                        continue;
                    }
                };
                rl.add_history_entry(&line).ok();

                match input {
                    Input::Slash(cmd) => {
                        if handle_slash_command(&cmd, &client) {
                            break;
                        }
                    }
                    Input::Request { method, params } => send(&client, method, params),
                    Input::Empty => {}
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();

    if client.pending_count() > 0 {
        eprintln!("({} request(s) still unanswered)", client.pending_count());
    }
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Line parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One line of console input.
#[derive(Debug, PartialEq)]
pub enum Input {
    Empty,
    Slash(String),
    Request { method: String, params: Value },
}

/// Split a line into a slash command or `method [json-params]`.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Empty);
    }
    if trimmed.starts_with('/') {
        return Ok(Input::Slash(trimmed.to_string()));
    }

    let (method, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((method, rest)) => (method, Some(rest)),
        None => (trimmed, None),
    };
    let params = parse_params(rest).map_err(|e| format!("params are not valid JSON: {e}"))?;

    Ok(Input::Request {
        method: method.to_string(),
        params,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests + output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Issue the request and print its answer from a background task.
fn send(client: &RpcClient, method: String, params: Value) {
    let pending = client.request(method.as_str(), params);
    let Some(id) = pending.id() else {
        // Rejected before reaching the wire.
        eprintln!("\x1B[31m{method}: disconnected, not sent\x1B[0m");
        return;
    };
    eprintln!("-> #{id} {method}");

    tokio::spawn(async move {
        let outcome = pending.await;
        let line = format_outcome(id, &outcome);
        if outcome.is_ok() {
            println!("{line}");
        } else {
            eprintln!("{line}");
        }
    });
}

pub fn format_outcome(id: u64, outcome: &Result<Value, RpcError>) -> String {
    match outcome {
        Ok(result) => {
            let pretty = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            format!("<- #{id} {pretty}")
        }
        Err(RpcError::Server(payload)) => format!("<- #{id} error {payload}"),
        Err(e) => format!("<- #{id} failed: {e}"),
    }
}

pub fn format_event(method: &str, params: Option<&Value>) -> String {
    match params {
        Some(params) => format!("event {method} {params}"),
        None => format!("event {method}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command.  Returns `true` if the console should exit.
fn handle_slash_command(input: &str, client: &RpcClient) -> bool {
    let cmd = input.split_whitespace().next().unwrap_or(input);

    match cmd {
        "/exit" | "/quit" => return true,

        "/state" => {
            eprintln!("{:?} ({})", client.state(), client.address());
        }

        "/pending" => {
            eprintln!(
                "{} pending, last id {}",
                client.pending_count(),
                client.last_request_id()
            );
        }

        "/help" => {
            eprintln!("Input:");
            eprintln!("  <method> [json-params]  Send a request (params default to null)");
            eprintln!("Commands:");
            eprintln!("  /state           Show the connection state");
            eprintln!("  /pending         Show unanswered requests");
            eprintln!("  /exit, /quit     Exit the console");
            eprintln!("  /help            Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}
