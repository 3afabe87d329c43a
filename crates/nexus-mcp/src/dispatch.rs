//! The transport-independent MCP core (spec §4.4): given a method name and
//! parameters already classified as a JSON-RPC request, produces the
//! `result` value or a `(code, message)` JSON-RPC error pair. Both
//! Streamable-HTTP and stdio transports share exactly this dispatch.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::protocol::{DEFAULT_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
use crate::registry::{Registry, ToolOutcome};

const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

pub const SERVER_NAME: &str = "nexus-agent";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct McpCore {
    registry: Arc<Registry>,
}

impl McpCore {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatches one already-classified JSON-RPC request. Returns the
    /// `result` value on success, or an `(code, message)` pair the caller
    /// wraps into a JSON-RPC error object.
    pub async fn handle(&self, method: &str, params: Value) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(self.initialize(&params)),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => Ok(self.list_resources()),
            "resources/read" => self.read_resource(params).await,
            "prompts/list" => Ok(self.list_prompts()),
            "prompts/get" => self.get_prompt(params).await,
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let requested = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested
        } else {
            DEFAULT_PROTOCOL_VERSION
        };
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {},
                "resources": {},
                "prompts": {},
            },
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .tools()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "annotations": {
                        "readOnlyHint": tool.annotations.read_only,
                        "destructiveHint": tool.annotations.destructive,
                        "idempotentHint": tool.annotations.idempotent,
                    },
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "tools/call requires a 'name'".to_string()))?;
        let Some(tool) = self.registry.tool(name) else {
            return Err((METHOD_NOT_FOUND, format!("Unknown tool: {name}")));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let outcome = match tool.handler.call(arguments).await {
            Ok(outcome) => outcome,
            Err(err) => ToolOutcome::text(format!("Failed to {name}: {}", err.message())),
        };
        Ok(json!({
            "content": [{ "type": "text", "text": outcome.into_text_block() }],
            "isError": false,
        }))
    }

    fn list_resources(&self) -> Value {
        let resources: Vec<Value> = self
            .registry
            .resources()
            .map(|resource| json!({ "uri": resource.uri, "mimeType": resource.mime }))
            .collect();
        json!({ "resources": resources })
    }

    async fn read_resource(&self, params: Value) -> Result<Value, (i64, String)> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "resources/read requires a 'uri'".to_string()))?;
        let Some(resource) = self.registry.resource(uri) else {
            return Err((METHOD_NOT_FOUND, format!("Unknown resource: {uri}")));
        };
        let body = resource.handler.read().await;
        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        Ok(json!({
            "contents": [{ "uri": resource.uri, "mimeType": resource.mime, "text": text }],
        }))
    }

    fn list_prompts(&self) -> Value {
        let prompts: Vec<Value> = self
            .registry
            .prompts()
            .map(|prompt| json!({ "name": prompt.name, "description": prompt.description }))
            .collect();
        json!({ "prompts": prompts })
    }

    async fn get_prompt(&self, params: Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "prompts/get requires a 'name'".to_string()))?;
        let Some(prompt) = self.registry.prompt(name) else {
            return Err((METHOD_NOT_FOUND, format!("Unknown prompt: {name}")));
        };
        let messages: Vec<Value> = prompt
            .handler
            .build()
            .await
            .into_iter()
            .map(|m| json!({ "role": m.role, "content": { "type": "text", "text": m.text } }))
            .collect();
        Ok(json!({ "description": prompt.description, "messages": messages }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Tool, ToolAnnotations};

    #[tokio::test]
    async fn initialize_echoes_a_supported_protocol_version() {
        let core = McpCore::new(Arc::new(Registry::new()));
        let result = core
            .handle("initialize", json!({ "protocolVersion": "2025-06-18" }))
            .await
            .unwrap();
        assert_eq!(result["protocolVersion"], "2025-06-18");
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let core = McpCore::new(Arc::new(Registry::new()));
        let err = core.handle("nonsense", json!({})).await.unwrap_err();
        assert_eq!(err.0, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn tool_call_routes_to_its_handler() {
        let mut registry = Registry::new();
        registry
            .register_tool(Tool {
                name: "echo",
                description: "echoes its input",
                annotations: ToolAnnotations::read_only(),
                handler: Arc::new(|args: Value| async move { Ok(ToolOutcome::Json(args)) }),
            })
            .unwrap();
        let core = McpCore::new(Arc::new(registry));
        let result = core
            .handle("tools/call", json!({ "name": "echo", "arguments": { "x": 1 } }))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert!(result["content"][0]["text"].as_str().unwrap().contains("\"x\": 1"));
    }
}
