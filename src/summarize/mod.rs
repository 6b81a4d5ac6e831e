//! Bounded summaries of externally fetched text.
//!
//! Every search hit goes through [`Summarizer::summarize`] before it reaches
//! the assistant. Summarization is best-effort: a failing model degrades to a
//! plain truncation of the source text and never surfaces an error.

mod openai;

pub use openai::OpenAICompletionModel;

use crate::config::{Prompts, SummarizerSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returned when there is nothing to summarize and no title to fall back on.
pub const NO_CONTENT: &str = "No content available.";

const ELLIPSIS: &str = "...";

/// Rough characters-per-token ratio used to bound model output.
const CHARS_PER_TOKEN: usize = 4;

/// A text-generation model.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete `prompt`, generating at most `max_output_tokens` tokens.
    async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String>;
}

/// Size limits applied by the summarizer.
#[derive(Debug, Clone, Copy)]
pub struct SummaryLimits {
    /// Characters of source content placed in the prompt.
    pub input_ceiling_chars: usize,
    pub max_output_tokens: u32,
    /// Length of the truncation fallback, ellipsis included.
    pub fallback_chars: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            input_ceiling_chars: 8000,
            max_output_tokens: 800,
            fallback_chars: 1000,
        }
    }
}

impl From<&SummarizerSettings> for SummaryLimits {
    fn from(settings: &SummarizerSettings) -> Self {
        Self {
            input_ceiling_chars: settings.input_ceiling_chars,
            max_output_tokens: settings.max_output_tokens,
            fallback_chars: settings.fallback_chars,
        }
    }
}

/// Truncate to at most `max` characters, ending in `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= ELLIPSIS.len() {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Query-anchored summarizer.
pub struct Summarizer {
    model: Arc<dyn CompletionModel>,
    limits: SummaryLimits,
    template: String,
}

impl Summarizer {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            limits: SummaryLimits::default(),
            template: Prompts::default().summary.user,
        }
    }

    pub fn with_limits(mut self, limits: SummaryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_prompts(mut self, prompts: &Prompts) -> Self {
        self.template = prompts.summary.user.clone();
        self
    }

    pub fn limits(&self) -> SummaryLimits {
        self.limits
    }

    /// Summarize `content` with respect to `query`. Never fails and never
    /// returns empty text.
    #[instrument(
        skip(self, content, query),
        fields(title = %title, chars = content.chars().count())
    )]
    pub async fn summarize(&self, content: &str, title: &str, url: &str, query: &str) -> String {
        if content.trim().is_empty() {
            debug!("Nothing to summarize for {}", url);
            return self.fallback(content, title);
        }

        let original_chars = content.chars().count();
        let bounded = truncate_chars(content, self.limits.input_ceiling_chars);

        let mut vars = HashMap::new();
        vars.insert("query", query);
        vars.insert("title", title);
        vars.insert("url", url);
        vars.insert("content", bounded.as_str());
        let prompt = Prompts::render(&self.template, &vars);

        match self.model.complete(&prompt, self.limits.max_output_tokens).await {
            Ok(summary) => {
                let output_cap = self.limits.max_output_tokens as usize * CHARS_PER_TOKEN;
                let summary = truncate_chars(summary.trim(), output_cap);
                let summary_chars = summary.chars().count();

                if summary.is_empty() {
                    warn!("Model returned an empty summary, using truncation");
                    return self.fallback(content, title);
                }
                if original_chars > self.limits.fallback_chars && summary_chars >= original_chars {
                    warn!("Summary did not shrink the content, using truncation");
                    return self.fallback(content, title);
                }

                info!(
                    "Summarized content from {} chars to {} chars",
                    original_chars, summary_chars
                );
                summary
            }
            Err(e) => {
                warn!("Error summarizing content: {}", e);
                self.fallback(content, title)
            }
        }
    }

    fn fallback(&self, content: &str, title: &str) -> String {
        let truncated = truncate_chars(content.trim(), self.limits.fallback_chars);
        let text = if !truncated.is_empty() {
            truncated
        } else if !title.trim().is_empty() {
            title.trim().to_string()
        } else {
            NO_CONTENT.to_string()
        };
        info!("Using fallback content: {} chars", text.chars().count());
        text
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ToolError;
    use std::sync::Mutex;

    /// Records prompts and replies with a canned result.
    pub(crate) struct ScriptedModel {
        pub reply: std::result::Result<String, String>,
        pub prompts: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedModel {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &str, max_output_tokens: u32) -> Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_output_tokens));
            self.reply.clone().map_err(ToolError::OpenAI)
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 7), "abcd...");
        assert_eq!(truncate_chars("abcdef", 2), "ab");
        let cut = truncate_chars(&"é".repeat(50), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
    }

    #[tokio::test]
    async fn test_prompt_content_is_bounded() {
        let model = Arc::new(ScriptedModel::replying("A tidy summary."));
        let summarizer = Summarizer::new(model.clone());
        let content = "x".repeat(20_000);

        let summary = summarizer
            .summarize(&content, "Big page", "https://a.test", "rust async")
            .await;
        assert_eq!(summary, "A tidy summary.");

        let prompts = model.prompts.lock().unwrap();
        let (prompt, budget) = &prompts[0];
        assert_eq!(*budget, 800);
        assert!(prompt.contains("\"rust async\""));
        assert!(prompt.contains("Title: Big page"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(7997))));
        assert!(!prompt.contains(&"x".repeat(7998)));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_truncation() {
        let summarizer = Summarizer::new(Arc::new(ScriptedModel::failing("throttled")));
        let content = "word ".repeat(1000);

        let summary = summarizer.summarize(&content, "t", "u", "q").await;
        assert_eq!(summary.chars().count(), 1000);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() < content.chars().count());
    }

    #[tokio::test]
    async fn test_fallback_is_never_empty() {
        let summarizer = Summarizer::new(Arc::new(ScriptedModel::failing("down")));
        assert_eq!(summarizer.summarize("   ", "Title", "u", "q").await, "Title");
        assert_eq!(summarizer.summarize("", "", "u", "q").await, NO_CONTENT);

        let empty_reply = Summarizer::new(Arc::new(ScriptedModel::replying("  ")));
        assert_eq!(empty_reply.summarize("short body", "t", "u", "q").await, "short body");
    }

    #[tokio::test]
    async fn test_summary_that_does_not_shrink_is_replaced() {
        let content = "y".repeat(1500);
        let summarizer = Summarizer::new(Arc::new(ScriptedModel::replying(&"z".repeat(1600))));

        let summary = summarizer.summarize(&content, "t", "u", "q").await;
        assert!(summary.starts_with("yyy"));
        assert!(summary.chars().count() < 1500);
    }

    #[tokio::test]
    async fn test_short_content_is_still_summarized() {
        let model = Arc::new(ScriptedModel::replying("Short."));
        let summarizer = Summarizer::new(model.clone());
        assert_eq!(summarizer.summarize("tiny", "t", "u", "q").await, "Short.");
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }
}
