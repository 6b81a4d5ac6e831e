//! Tool invocation contract.
//!
//! Every tool declares a [`ToolSchema`]; arguments are validated against it
//! before the tool body runs, and every body returns a [`ToolResult`].

mod context;
mod registry;
mod schema;

pub use context::{BotConfig, CallerContext, FirecrawlConfig, InternetToolConfig};
pub use registry::ToolRegistry;
pub use schema::{FieldKind, FieldSpec, ToolSchema};

use crate::error::{Result, ToolError};
use crate::search::SearchResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to run one tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub caller: CallerContext,
}

impl ToolRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            caller: CallerContext::default(),
        }
    }

    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = caller;
        self
    }
}

/// Kind of media a result carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    None,
    Image,
    Video,
}

/// Normalized result of every tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    /// Human-readable summary, always present.
    pub content: String,
    /// Artifact or result label.
    pub source_name: String,
    /// Retrieval URL.
    pub source_link: Option<String>,
    pub media_kind: MediaKind,
    /// Small media returned alongside the link. Requires `media_kind != None`.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_payload"
    )]
    pub inline_payload: Option<Vec<u8>>,
    /// Individual results for tools that return several citations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SearchResult>,
}

fn serialize_payload<S>(
    payload: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::Engine as _;
    match payload {
        Some(bytes) => {
            serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        None => serializer.serialize_none(),
    }
}

impl ToolResult {
    /// A text-only result.
    pub fn text(content: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_name: source_name.into(),
            source_link: None,
            media_kind: MediaKind::None,
            inline_payload: None,
            sources: Vec::new(),
        }
    }

    /// A result pointing at a stored artifact.
    pub fn artifact(
        content: impl Into<String>,
        source_name: impl Into<String>,
        link: impl Into<String>,
        media_kind: MediaKind,
    ) -> Self {
        Self {
            source_link: Some(link.into()),
            media_kind,
            ..Self::text(content, source_name)
        }
    }

    /// Attach inline media. Fails for results without a media kind.
    pub fn with_inline_payload(mut self, payload: Vec<u8>) -> Result<Self> {
        if self.media_kind == MediaKind::None {
            return Err(ToolError::Provider(
                "inline payload requires a media kind".to_string(),
            ));
        }
        self.inline_payload = Some(payload);
        Ok(self)
    }

    pub fn with_sources(mut self, sources: Vec<SearchResult>) -> Self {
        self.sources = sources;
        self
    }

    /// Check the structural invariants of a result.
    pub fn check(&self) -> Result<()> {
        if self.inline_payload.is_some() && self.media_kind == MediaKind::None {
            return Err(ToolError::Provider(
                "result carries an inline payload but no media kind".to_string(),
            ));
        }
        Ok(())
    }
}

/// Static description of a tool for the calling model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
    /// Only offered to bots that enable it explicitly.
    pub bot_scoped: bool,
}

impl ToolSpec {
    /// OpenAI-compatible function tool definition.
    pub fn to_function_definition(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.schema.to_json_schema(),
            }
        })
    }
}

/// A typed tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Typed arguments, deserialized from the validated argument object.
    type Args: DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schema(&self) -> ToolSchema;

    /// Whether the tool is only available to bots that enable it.
    fn bot_scoped(&self) -> bool {
        false
    }

    /// Run the tool body.
    async fn run(&self, args: Self::Args, caller: &CallerContext) -> Result<ToolResult>;
}

/// Object-safe view of a [`Tool`], used by the registry.
#[async_trait]
pub trait DynTool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Deserialize validated arguments and run the body.
    async fn call(&self, args: Value, caller: &CallerContext) -> Result<ToolResult>;
}

#[async_trait]
impl<T> DynTool for T
where
    T: Tool + 'static,
{
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            schema: self.schema(),
            bot_scoped: self.bot_scoped(),
        }
    }

    async fn call(&self, args: Value, caller: &CallerContext) -> Result<ToolResult> {
        let typed: T::Args = serde_json::from_value(args)
            .map_err(|e| ToolError::invalid("arguments", e.to_string()))?;
        self.run(typed, caller).await
    }
}
