//! Atelier - tool invocation and artifact delivery
//!
//! A catalogue of tools that a conversational agent can call: web search with
//! summarized results, image and video generation, and spreadsheet, document
//! and slide-deck generation. Every tool runs behind one contract and every
//! produced file is delivered through a signed, time-limited link.
//!
//! # Architecture
//!
//! - `contract` - Tool trait, argument schemas, registry and caller context
//! - `artifact` - Artifact stores and link signing
//! - `summarize` - Bounded, failure-tolerant content summarization
//! - `search` - Search backends and backend selection
//! - `generation` - Image/video providers and the video job controller
//! - `tools` - The shipped tools and catalogue assembly
//! - `mcp` - MCP server over stdio
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use atelier::config::Settings;
//! use atelier::contract::ToolRequest;
//! use atelier::tools::build_catalogue;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let registry = build_catalogue(&settings)?;
//!
//!     let result = registry
//!         .invoke(ToolRequest::new(
//!             "spreadsheet_generator",
//!             json!({"title": "Q3", "data": [{"region": "EU", "total": 10}]}),
//!         ))
//!         .await?;
//!     println!("{}", result.content);
//!
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod generation;
pub mod mcp;
pub mod openai;
pub mod search;
pub mod summarize;
pub mod tools;

pub use error::{Result, ToolError};
