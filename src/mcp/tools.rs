//! Mapping between the tool contract and MCP payloads.

use super::protocol::{Tool, ToolCallResult, ToolContent};
use crate::contract::{MediaKind, ToolResult, ToolSpec};
use crate::error::ToolError;
use base64::Engine as _;

/// MCP definition of a catalogue entry.
pub fn mcp_tool(spec: &ToolSpec) -> Tool {
    Tool {
        name: spec.name.clone(),
        description: spec.description.clone(),
        input_schema: spec.schema.to_json_schema(),
    }
}

/// Render a tool result as MCP content: the text first, then any inline image.
pub fn call_result(result: &ToolResult) -> ToolCallResult {
    let mut text = result.content.clone();
    if let Some(link) = &result.source_link {
        if !text.contains(link.as_str()) {
            text.push_str(&format!("\n\n{}: {}", result.source_name, link));
        }
    }

    let mut call = ToolCallResult::text(text);
    if let (MediaKind::Image, Some(payload)) = (result.media_kind, &result.inline_payload) {
        call.content.push(ToolContent::Image {
            data: base64::engine::general_purpose::STANDARD.encode(payload),
            mime_type: "image/png".to_string(),
        });
    }
    call
}

/// Render a failed call, tagged with the error kind.
pub fn error_result(error: &ToolError) -> ToolCallResult {
    ToolCallResult::error(format!("[{}] {}", error.kind(), error))
}
