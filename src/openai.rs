//! OpenAI client configuration with sensible defaults.

use crate::config::OpenAISettings;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Create an OpenAI client for the configured endpoint and timeout.
pub fn create_client(settings: &OpenAISettings) -> Client<OpenAIConfig> {
    let http_client = http_client(Duration::from_secs(settings.timeout_secs));
    let config = OpenAIConfig::default().with_api_base(settings.base_url.trim_end_matches('/'));

    Client::with_config(config).with_http_client(http_client)
}

/// Build a reqwest client with the given timeout.
///
/// Falls back to the default client if the builder rejects the configuration.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Read the API key from the environment.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}
