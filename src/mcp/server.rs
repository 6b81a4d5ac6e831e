//! MCP server implementation.

use super::protocol::*;
use super::tools::{call_result, error_result, mcp_tool};
use crate::contract::{CallerContext, ToolRegistry, ToolRequest};
use crate::error::ToolError;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "atelier";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serves the tool catalogue to one caller over JSON-RPC.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    caller: CallerContext,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>, caller: CallerContext) -> Self {
        Self { registry, caller }
    }

    /// Run on stdin/stdout. Logging must go to stderr.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("MCP server starting");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve line-delimited JSON-RPC until `reader` closes.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => match self.handle_request(request).await {
                    Some(response) => response,
                    None => continue,
                },
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    JsonRpcResponse::error(None, PARSE_ERROR, "Parse error")
                }
            };

            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }

        info!("MCP input closed");
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        if notification && request.method.starts_with("notifications/") {
            debug!("Notification: {}", request.method);
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        };

        if notification {
            debug!("Handled {} as a notification; dropping response", request.method);
            return None;
        }
        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };
        JsonRpcResponse::from_result(id, &result)
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = self
            .registry
            .available_for(&self.caller)
            .iter()
            .map(mcp_tool)
            .collect();
        JsonRpcResponse::from_result(id, &ToolsListResult { tools })
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        &format!("Invalid params: {}", e),
                    )
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let offered = self
            .registry
            .available_for(&self.caller)
            .iter()
            .any(|spec| spec.name == params.name);
        if !offered {
            let err = ToolError::invalid(
                "name",
                format!("tool '{}' is not available", params.name),
            );
            return JsonRpcResponse::from_result(id, &error_result(&err));
        }

        let request = ToolRequest::new(params.name, params.arguments.unwrap_or(Value::Null))
            .with_caller(self.caller.clone());
        let result = match self.registry.invoke(request).await {
            Ok(result) => call_result(&result),
            Err(e) => error_result(&e),
        };
        JsonRpcResponse::from_result(id, &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::harness;

    fn server() -> McpServer {
        McpServer::new(Arc::new(harness().registry), CallerContext::default())
    }

    fn request(line: Value) -> JsonRpcRequest {
        serde_json::from_value(line).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let server = server();
        let init = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {}
            })))
            .await
            .unwrap();
        let init = serde_json::to_value(init).unwrap();
        assert_eq!(init["result"]["serverInfo"]["name"], "atelier");

        let list = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap();
        let list = serde_json::to_value(list).unwrap();
        let names: Vec<&str> = list["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"image_generator"));
        assert!(!names.contains(&"internet_search"));
        assert_eq!(list["result"]["tools"][0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let server = server();
        let response = server
            .handle_request(request(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            ))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_request_without_id_runs_silently() {
        let h = harness();
        let images = h.images.clone();
        let server = McpServer::new(Arc::new(h.registry), CallerContext::default());

        let ping = server
            .handle_request(request(json!({"jsonrpc": "2.0", "method": "ping"})))
            .await;
        assert!(ping.is_none());

        let call = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {"name": "image_generator", "arguments": {"prompt": "a kite"}}
            })))
            .await;
        assert!(call.is_none());
        assert_eq!(images.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_call_returns_image_content() {
        let server = server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "image_generator", "arguments": {"prompt": "a kite"}}
            })))
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["result"]["content"][1]["type"], "image");
        assert!(value["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn test_call_errors_are_tool_results() {
        let server = server();
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "image_generator", "arguments": {"width": 1024}}
            })))
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["result"]["isError"], true);
        assert!(value["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("[invalid_argument]"));

        let hidden = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 5,
                "method": "tools/call",
                "params": {"name": "internet_search", "arguments": {}}
            })))
            .await
            .unwrap();
        let value = serde_json::to_value(hidden).unwrap();
        assert_eq!(value["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_serve_over_lines() {
        let server = server();
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"resources/list\"}\n",
        );
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[2]["error"]["code"], METHOD_NOT_FOUND);
    }
}
