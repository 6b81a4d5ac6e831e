//! OpenAI chat completion model.

use super::CompletionModel;
use crate::config::OpenAISettings;
use crate::error::{Result, ToolError};
use crate::openai::create_client;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Completion model backed by the OpenAI chat API.
pub struct OpenAICompletionModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAICompletionModel {
    pub fn new(settings: &OpenAISettings, model: &str) -> Self {
        Self {
            client: create_client(settings),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ToolError::OpenAI(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .max_completion_tokens(max_output_tokens)
            .temperature(0.2)
            .build()
            .map_err(|e| ToolError::OpenAI(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            ToolError::OpenAI(format!("Failed to generate summary: {}", e))
        })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ToolError::OpenAI("Empty response from model".to_string()))?;

        debug!("Model returned {} chars", text.len());
        Ok(text)
    }
}
