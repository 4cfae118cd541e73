//! MCP protocol types (JSON-RPC 2.0), client side.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC request.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC notification (no id, no response).
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.to_string(),
            params: None,
        }
    }
}

/// Any message read back from the server.
///
/// `method` is set when the server sent its own request or notification
/// rather than a response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Whether this message answers the request with the given id.
    pub fn answers(&self, id: u64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    /// Split into the result payload or the remote error.
    pub fn into_result(self) -> std::result::Result<Value, JsonRpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Name and version of a client or server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

/// MCP Initialize request params.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

#[derive(Debug, Serialize, Default)]
pub struct ClientCapabilities {}

/// MCP Initialize response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<Implementation>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Tools list request params.
#[derive(Debug, Serialize, Default)]
pub struct ListToolsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Tool definition as advertised by the server.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// Tools list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Tool call request params.
#[derive(Debug, Serialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Value,
}

/// Tool call response.
#[derive(Debug, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        #[serde(rename = "mimeType", default)]
        mime_type: String,
    },
    #[serde(rename = "resource")]
    Resource { resource: Value },
    #[serde(other)]
    Unsupported,
}

impl ToolContent {
    /// Render the content item as text for the model.
    pub fn render(&self) -> String {
        match self {
            ToolContent::Text { text } => text.clone(),
            ToolContent::Image { mime_type } => format!("[image: {}]", mime_type),
            ToolContent::Resource { resource } => resource
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| resource.to_string()),
            ToolContent::Unsupported => "[unsupported content]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(7, "tools/list", None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"}));

        let notification = JsonRpcNotification::new("notifications/initialized");
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
    }

    #[test]
    fn test_initialize_params_camel_case() {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "marquee".to_string(),
                version: "0.1.0".to_string(),
            },
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
        assert_eq!(value["clientInfo"]["name"], "marquee");
        assert_eq!(value["capabilities"], json!({}));
    }

    #[test]
    fn test_response_matching() {
        let response: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#).unwrap();
        assert!(response.answers(3));
        assert!(!response.answers(4));
        assert_eq!(response.into_result().unwrap(), json!({"ok": true}));

        let server_request: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#).unwrap();
        assert!(!server_request.answers(3));
    }

    #[test]
    fn test_error_response() {
        let response: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let error = response.into_result().unwrap_err();
        assert_eq!(error.code, -32601);
        assert_eq!(error.to_string(), "Method not found (code -32601)");
    }

    #[test]
    fn test_tool_defaults_and_cursor() {
        let result: ListToolsResult = serde_json::from_value(json!({
            "tools": [{"name": "get_trending"}],
            "nextCursor": "abc"
        }))
        .unwrap();
        assert_eq!(result.next_cursor.as_deref(), Some("abc"));
        assert_eq!(result.tools[0].description, None);
        assert_eq!(result.tools[0].input_schema["type"], "object");
    }

    #[test]
    fn test_call_result_content() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "The Matrix (1999)"},
                {"type": "image", "mimeType": "image/png", "data": "..."},
                {"type": "audio", "data": "..."}
            ],
            "isError": false
        }))
        .unwrap();

        let rendered: Vec<String> = result.content.iter().map(ToolContent::render).collect();
        assert_eq!(
            rendered,
            vec!["The Matrix (1999)", "[image: image/png]", "[unsupported content]"]
        );
        assert!(!result.is_error);
    }
}
