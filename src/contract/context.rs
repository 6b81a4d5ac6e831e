//! Caller identity and per-bot configuration.

use serde::{Deserialize, Serialize};

/// Who is invoking a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerContext {
    /// Bot configuration, absent for plain chat.
    #[serde(default)]
    pub bot: Option<BotConfig>,
    /// Model driving the conversation.
    #[serde(default)]
    pub model: Option<String>,
}

impl CallerContext {
    /// Context for a bot.
    pub fn for_bot(bot: BotConfig) -> Self {
        Self {
            bot: Some(bot),
            model: None,
        }
    }

    /// The bot's internet tool configuration, if any.
    pub fn internet_config(&self) -> Option<&InternetToolConfig> {
        self.bot.as_ref().and_then(|b| b.internet.as_ref())
    }
}

/// Per-bot configuration relevant to tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub id: String,
    /// Tool names enabled for this bot.
    pub tools: Vec<String>,
    pub internet: Option<InternetToolConfig>,
}

impl BotConfig {
    /// Load a bot configuration from a TOML or JSON file.
    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|e| e == "json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    pub fn enables(&self, tool: &str) -> bool {
        self.tools.iter().any(|t| t == tool)
    }
}

/// Search engine selection for a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InternetToolConfig {
    /// Engine name as configured; unrecognized names are tolerated.
    pub search_engine: String,
    pub firecrawl: Option<FirecrawlConfig>,
}

impl Default for InternetToolConfig {
    fn default() -> Self {
        Self {
            search_engine: "duckduckgo".to_string(),
            firecrawl: None,
        }
    }
}

/// Credentials and limits for the Firecrawl backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirecrawlConfig {
    pub api_key: String,
    pub max_results: usize,
}

impl Default for FirecrawlConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_config_from_toml() {
        let bot: BotConfig = toml::from_str(
            r#"
            id = "research-bot"
            tools = ["internet_search", "document_generator"]

            [internet]
            search_engine = "firecrawl"

            [internet.firecrawl]
            api_key = "fc-123"
            "#,
        )
        .unwrap();

        assert!(bot.enables("internet_search"));
        assert!(!bot.enables("video_generator"));
        let internet = bot.internet.unwrap();
        assert_eq!(internet.search_engine, "firecrawl");
        assert_eq!(internet.firecrawl.unwrap().max_results, 10);
    }

    #[test]
    fn test_bot_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.json");
        std::fs::write(&path, r#"{"id": "b1", "tools": ["image_generator"]}"#).unwrap();

        let bot = BotConfig::load(&path).unwrap();
        assert_eq!(bot.id, "b1");
        assert!(bot.internet.is_none());
    }
}
