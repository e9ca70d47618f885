//! `wsrpc`: interactive console and one-shot caller for JSON-RPC peers
//! reachable over WebSocket.

pub mod cli;
