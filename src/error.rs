//! Error types for atelier.

use thiserror::Error;

/// Boxed cause carried by [`ToolError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Library-level error type for tool invocations.
///
/// The first group of variants is the caller-facing taxonomy. The second group
/// holds low-level failures; [`crate::contract::ToolRegistry`] wraps those into
/// [`ToolError::Execution`] before they leave a tool body.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Unexpected job status: {0}")]
    UnexpectedStatus(String),

    #[error("Job {job_id} timed out after {elapsed_secs}s")]
    TimedOut { job_id: String, elapsed_secs: u64 },

    #[error("Tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: BoxError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl ToolError {
    /// Shorthand for an [`ToolError::InvalidArgument`] naming `field`.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable label used in logs and on the MCP surface.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArgument { .. } => "invalid_argument",
            ToolError::Configuration(_) => "configuration_error",
            ToolError::Storage(_) => "storage_error",
            ToolError::GenerationFailed(_) => "generation_failed",
            ToolError::UnexpectedStatus(_) => "unexpected_status",
            ToolError::TimedOut { .. } => "timed_out",
            _ => "tool_execution_error",
        }
    }

    /// Whether this error belongs to the caller-facing taxonomy and may cross
    /// the registry boundary unwrapped.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            ToolError::InvalidArgument { .. }
                | ToolError::Configuration(_)
                | ToolError::Storage(_)
                | ToolError::GenerationFailed(_)
                | ToolError::UnexpectedStatus(_)
                | ToolError::TimedOut { .. }
                | ToolError::Execution { .. }
        )
    }

    /// Wrap an unclassified error as a [`ToolError::Execution`] for `tool`.
    ///
    /// Classified errors are returned unchanged.
    pub fn into_execution(self, tool: &str) -> Self {
        if self.is_classified() {
            self
        } else {
            ToolError::Execution {
                tool: tool.to_string(),
                source: Box::new(self),
            }
        }
    }
}

/// Result type alias for atelier operations.
pub type Result<T> = std::result::Result<T, ToolError>;
