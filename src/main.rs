//! Atelier CLI entry point.

use anyhow::Result;
use atelier::cli::{commands, Cli, Commands};
use atelier::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries MCP traffic and fetched bytes
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("atelier={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Tools { bot } => {
            commands::run_tools(bot.as_deref(), &settings)?;
        }

        Commands::Call {
            tool,
            args,
            bot,
            json,
        } => {
            commands::run_call(tool, args, bot.as_deref(), *json, &settings).await?;
        }

        Commands::Fetch { url, output } => {
            commands::run_fetch(url, output.as_deref(), &settings).await?;
        }

        Commands::Mcp { bot } => {
            commands::run_mcp(bot.as_deref(), &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
