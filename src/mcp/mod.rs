//! MCP (Model Context Protocol) server for the tool catalogue.
//!
//! Implements JSON-RPC 2.0 over stdio.

mod protocol;
mod server;
mod tools;

pub use protocol::{JsonRpcRequest, JsonRpcResponse};
pub use server::McpServer;
