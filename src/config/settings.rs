//! Configuration settings for atelier.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAISettings,
    pub storage: StorageSettings,
    pub summarizer: SummarizerSettings,
    pub search: SearchSettings,
    pub image: ImageSettings,
    pub video: VideoSettings,
    pub catalogue: CatalogueSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.atelier".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// OpenAI endpoint settings. The API key is only ever read from `OPENAI_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Artifact store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding artifact bytes.
    pub root_dir: String,
    /// SQLite file holding artifact records.
    pub index_path: String,
    /// Base URL under which `root_dir` is published.
    pub public_base_url: String,
    /// Validity of an issued retrieval link.
    pub link_ttl_hours: i64,
    /// Object expiry, set at write time.
    pub retention_days: i64,
    /// Secret used to sign retrieval links (`ATELIER_SIGNING_KEY` overrides).
    pub signing_key: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root_dir: "~/.atelier/artifacts".to_string(),
            index_path: "~/.atelier/artifacts.db".to_string(),
            public_base_url: "http://localhost:8080/artifacts".to_string(),
            link_ttl_hours: 24,
            retention_days: 30,
            signing_key: None,
        }
    }
}

/// Content summarizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerSettings {
    /// Chat model used for summaries.
    pub model: String,
    /// Characters of source content sent to the model.
    pub input_ceiling_chars: usize,
    /// Output token budget for one summary.
    pub max_output_tokens: u32,
    /// Length of the truncation fallback, ellipsis included.
    pub fallback_chars: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            input_ceiling_chars: 8000,
            max_output_tokens: 800,
            fallback_chars: 1000,
        }
    }
}

/// Search backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub duckduckgo_url: String,
    pub duckduckgo_max_results: usize,
    /// DuckDuckGo safe search (strict, moderate, off).
    pub safe_search: String,
    pub firecrawl_url: String,
    pub request_timeout_secs: u64,
    /// Results summarized concurrently.
    pub summary_concurrency: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            duckduckgo_url: "https://html.duckduckgo.com/html/".to_string(),
            duckduckgo_max_results: 20,
            safe_search: "moderate".to_string(),
            firecrawl_url: "https://api.firecrawl.dev/v1".to_string(),
            request_timeout_secs: 20,
            summary_concurrency: 4,
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub model: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".to_string(),
        }
    }
}

/// Video generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub model: String,
    /// Seconds between status polls.
    pub poll_interval_secs: u64,
    /// Wall-clock budget for one job.
    pub timeout_secs: u64,
    /// Provider-side staging location for job output.
    pub staging_prefix: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            model: "sora-2".to_string(),
            poll_interval_secs: 10,
            timeout_secs: 300,
            staging_prefix: "video_staging/".to_string(),
        }
    }
}

/// Tool catalogue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogueSettings {
    /// Offer the general-purpose tools to callers without a bot configuration.
    pub enable_for_plain_chat: bool,
}

impl Default for CatalogueSettings {
    fn default() -> Self {
        Self {
            enable_for_plain_chat: true,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ToolError::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("atelier")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded artifact directory path.
    pub fn artifact_dir(&self) -> PathBuf {
        Self::expand_path(&self.storage.root_dir)
    }

    /// Get the expanded artifact index path.
    pub fn artifact_index_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.index_path)
    }

    /// Resolve the link signing key, preferring `ATELIER_SIGNING_KEY`.
    pub fn signing_key(&self) -> Option<String> {
        std::env::var("ATELIER_SIGNING_KEY")
            .ok()
            .or_else(|| self.storage.signing_key.clone())
            .filter(|k| !k.trim().is_empty())
    }
}
