//! Call command implementation.

use super::load_caller;
use crate::cli::Output;
use crate::config::Settings;
use crate::contract::ToolRequest;
use crate::tools::build_catalogue;
use anyhow::{Context, Result};
use serde_json::Value;

/// Invoke one tool and print its result.
pub async fn run_call(
    tool: &str,
    args: &str,
    bot: Option<&str>,
    json: bool,
    settings: &Settings,
) -> Result<()> {
    let arguments: Value =
        serde_json::from_str(args).context("Tool arguments must be a JSON object")?;
    let caller = load_caller(bot)?;
    let registry = build_catalogue(settings)?;

    let spinner = Output::spinner(&format!("Running {}...", tool));
    let result = registry
        .invoke(ToolRequest::new(tool, arguments).with_caller(caller))
        .await;
    spinner.finish_and_clear();

    let result = result.map_err(|e| anyhow::anyhow!("[{}] {}", e.kind(), e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        Output::tool_result(&result);
    }
    Ok(())
}
