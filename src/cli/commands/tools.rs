//! Tools command implementation.

use super::load_caller;
use crate::cli::Output;
use crate::config::Settings;
use crate::tools::build_catalogue;
use anyhow::Result;

/// List the catalogue offered to the caller.
pub fn run_tools(bot: Option<&str>, settings: &Settings) -> Result<()> {
    let caller = load_caller(bot)?;
    let registry = build_catalogue(settings)?;
    let offered = registry.available_for(&caller);

    match &caller.bot {
        Some(bot) => Output::header(&format!("Tools for bot '{}'", bot.id)),
        None => Output::header("Tools for plain chat"),
    }

    if offered.is_empty() {
        Output::warning("No tools are offered to this caller.");
        return Ok(());
    }

    for spec in &offered {
        Output::tool_spec(spec);
    }
    Ok(())
}
