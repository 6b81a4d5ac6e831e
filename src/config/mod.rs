//! Configuration module for atelier.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, SummaryPrompts};
pub use settings::{
    CatalogueSettings, GeneralSettings, ImageSettings, OpenAISettings, PromptSettings,
    SearchSettings, Settings, StorageSettings, SummarizerSettings, VideoSettings,
};
