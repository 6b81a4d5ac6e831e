//! CLI command implementations.

mod call;
mod config;
mod fetch;
mod mcp;
mod tools;

pub use call::run_call;
pub use config::run_config;
pub use fetch::run_fetch;
pub use mcp::run_mcp;
pub use tools::run_tools;

use crate::contract::{BotConfig, CallerContext};
use anyhow::{Context, Result};
use std::path::Path;

/// Caller context from an optional bot configuration file.
fn load_caller(bot: Option<&str>) -> Result<CallerContext> {
    match bot {
        Some(path) => {
            let config = BotConfig::load(Path::new(path))
                .with_context(|| format!("Failed to load bot configuration {}", path))?;
            Ok(CallerContext::for_bot(config))
        }
        None => Ok(CallerContext::default()),
    }
}
