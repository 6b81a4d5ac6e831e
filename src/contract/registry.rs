//! Tool registry: lookup, validation, invocation and catalogue enumeration.

use super::{CallerContext, DynTool, Tool, ToolRequest, ToolResult, ToolSpec};
use crate::error::{Result, ToolError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Registered tools, keyed by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn DynTool>>,
    enable_for_plain_chat: bool,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            enable_for_plain_chat: true,
        }
    }

    /// Whether callers without a bot configuration are offered tools.
    pub fn with_plain_chat(mut self, enabled: bool) -> Self {
        self.enable_for_plain_chat = enabled;
        self
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_dyn(Arc::new(tool));
    }

    pub fn register_dyn(&mut self, tool: Arc<dyn DynTool>) {
        let name = tool.spec().name;
        self.tools.insert(name, tool);
    }

    /// Specs of all registered tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tools offered to a caller.
    ///
    /// Plain chat gets every tool that is not bot-scoped (or nothing, when
    /// disabled); a bot gets exactly the registered tools it enables.
    pub fn available_for(&self, caller: &CallerContext) -> Vec<ToolSpec> {
        match &caller.bot {
            None if self.enable_for_plain_chat => {
                self.specs().into_iter().filter(|s| !s.bot_scoped).collect()
            }
            None => Vec::new(),
            Some(bot) => self
                .specs()
                .into_iter()
                .filter(|s| bot.enables(&s.name))
                .collect(),
        }
    }

    /// Validate and run a tool request.
    ///
    /// Validation failures return [`ToolError::InvalidArgument`] before the
    /// tool body runs. Failures from the body that fall outside the taxonomy
    /// are wrapped into [`ToolError::Execution`]; nothing is retried here.
    #[instrument(skip(self, request), fields(tool = %request.tool_name))]
    pub async fn invoke(&self, request: ToolRequest) -> Result<ToolResult> {
        let tool = self.tools.get(&request.tool_name).ok_or_else(|| {
            ToolError::invalid("tool_name", format!("unknown tool '{}'", request.tool_name))
        })?;

        let spec = tool.spec();
        let args = spec.schema.validate(&request.arguments).inspect_err(|e| {
            warn!("Rejected arguments for {}: {}", spec.name, e);
        })?;

        info!("Invoking tool {}", spec.name);

        let result = tool
            .call(args, &request.caller)
            .await
            .and_then(|result| result.check().map(|_| result))
            .map_err(|e| e.into_execution(&spec.name));

        match &result {
            Ok(r) => info!("Tool {} completed: {}", spec.name, r.source_name),
            Err(e) => warn!("Tool {} failed ({}): {}", spec.name, e.kind(), e),
        }

        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
