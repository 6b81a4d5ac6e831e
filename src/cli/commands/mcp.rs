//! MCP command implementation.

use super::load_caller;
use crate::config::Settings;
use crate::mcp::McpServer;
use crate::tools::build_catalogue;
use anyhow::Result;
use std::sync::Arc;

/// Run the MCP server.
pub async fn run_mcp(bot: Option<&str>, settings: &Settings) -> Result<()> {
    let caller = load_caller(bot)?;
    let registry = Arc::new(build_catalogue(settings)?);
    McpServer::new(registry, caller).run().await
}
