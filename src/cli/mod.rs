//! CLI module for atelier.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Atelier - tool invocation and artifact delivery
///
/// Runs the tool catalogue (search, image, video and document generation)
/// from the command line or as an MCP server.
#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the tools offered to a caller
    Tools {
        /// Bot configuration file (TOML or JSON); plain chat if omitted
        #[arg(short, long)]
        bot: Option<String>,
    },

    /// Invoke one tool
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Bot configuration file (TOML or JSON); plain chat if omitted
        #[arg(short, long)]
        bot: Option<String>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download an artifact through its signed link
    Fetch {
        /// Signed retrieval URL
        url: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Start MCP server for AI assistant integration
    Mcp {
        /// Bot configuration file (TOML or JSON); plain chat if omitted
        #[arg(short, long)]
        bot: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration with a fresh signing key
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
