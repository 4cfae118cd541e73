//! MCP client: handshake, tool listing and tool calls against one server.

use super::protocol::*;
use super::tools::{ToolDescriptor, ToolOutput};
use super::transport::StdioTransport;
use crate::config::McpServerSettings;
use crate::error::{MarqueeError, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Failures talking to a server, before they are attributed to an operation.
#[derive(Error, Debug)]
enum McpError {
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server closed the connection")]
    Closed,

    #[error("timed out after {0}ms")]
    Timeout(u128),

    #[error("server returned an error: {0}")]
    Remote(JsonRpcError),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

struct Connection {
    transport: StdioTransport,
    next_id: u64,
}

impl Connection {
    /// Send a request and wait for the response carrying its id.
    async fn round_trip(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        debug!("-> {} (id {})", method, id);
        self.transport
            .send(&JsonRpcRequest::new(id, method, params))
            .await?;

        loop {
            let line = self.transport.recv().await?.ok_or(McpError::Closed)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: JsonRpcResponse = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(_) => {
                    debug!("Skipping non JSON-RPC output: {}", line);
                    continue;
                }
            };

            if message.answers(id) {
                debug!("<- {} (id {})", method, id);
                return message.into_result().map_err(McpError::Remote);
            }

            debug!("Skipping unrelated message: {}", line);
        }
    }
}

/// Connected MCP server.
pub struct McpClient {
    name: String,
    timeout: Duration,
    server_info: Option<Implementation>,
    instructions: Option<String>,
    connection: Mutex<Connection>,
}

impl McpClient {
    /// Launch the server and complete the MCP handshake within the configured timeout.
    #[instrument(skip(settings), fields(command = %settings.command))]
    pub async fn connect(name: &str, settings: &McpServerSettings) -> Result<Self> {
        let args = settings
            .resolved_args()
            .map_err(|e| MarqueeError::discovery(name, e))?;
        let env = settings
            .resolved_env()
            .map_err(|e| MarqueeError::discovery(name, e))?;

        let transport = StdioTransport::spawn(name, &settings.command, &args, &env)
            .map_err(|source| {
                MarqueeError::discovery(
                    name,
                    McpError::Launch {
                        command: settings.command.clone(),
                        source,
                    },
                )
            })?;

        let mut client = Self {
            name: name.to_string(),
            timeout: settings.timeout(),
            server_info: None,
            instructions: None,
            connection: Mutex::new(Connection {
                transport,
                next_id: 1,
            }),
        };

        match client.initialize().await {
            Ok(result) => {
                info!(
                    "Connected to MCP server '{}' ({} {}, protocol {})",
                    name,
                    result.server_info.as_ref().map(|i| i.name.as_str()).unwrap_or("unknown"),
                    result.server_info.as_ref().map(|i| i.version.as_str()).unwrap_or("?"),
                    result.protocol_version
                );
                client.server_info = result.server_info;
                client.instructions = result.instructions;
                Ok(client)
            }
            Err(e) => {
                client.shutdown().await;
                Err(MarqueeError::discovery(name, e))
            }
        }
    }

    async fn initialize(&self) -> std::result::Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: CLIENT_NAME.to_string(),
                version: CLIENT_VERSION.to_string(),
            },
        };

        let mut connection = self.connection.lock().await;
        let handshake = async {
            let value = connection
                .round_trip("initialize", Some(serde_json::to_value(params)?))
                .await?;
            let result: InitializeResult = serde_json::from_value(value)?;
            connection
                .transport
                .send(&JsonRpcNotification::new("notifications/initialized"))
                .await?;
            Ok::<_, McpError>(result)
        };

        tokio::time::timeout(self.timeout, handshake)
            .await
            .map_err(|_| McpError::Timeout(self.timeout.as_millis()))?
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> std::result::Result<Value, McpError> {
        let mut connection = self.connection.lock().await;
        tokio::time::timeout(self.timeout, connection.round_trip(method, params))
            .await
            .map_err(|_| McpError::Timeout(self.timeout.as_millis()))?
    }

    /// Server name this client was configured under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name and version the server reported during the handshake.
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    /// Usage hints the server sent during the handshake.
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    /// List every tool the server advertises, following pagination.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.fetch_tools()
            .await
            .map_err(|e| MarqueeError::discovery(&self.name, e))
    }

    async fn fetch_tools(&self) -> std::result::Result<Vec<ToolDescriptor>, McpError> {
        let mut descriptors = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = ListToolsParams {
                cursor: cursor.clone(),
            };
            let value = self
                .request("tools/list", Some(serde_json::to_value(params)?))
                .await?;
            let page: ListToolsResult = serde_json::from_value(value)?;

            for tool in page.tools {
                if tool.name.trim().is_empty() {
                    return Err(McpError::Malformed("tool with an empty name".to_string()));
                }
                if !seen.insert(tool.name.clone()) {
                    return Err(McpError::Malformed(format!(
                        "tool '{}' is listed more than once",
                        tool.name
                    )));
                }
                descriptors.push(ToolDescriptor {
                    server: self.name.clone(),
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                });
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(McpError::Malformed(format!(
                        "pagination cursor '{}' repeated",
                        next
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!("Server '{}' advertised {} tools", self.name, descriptors.len());
        Ok(descriptors)
    }

    /// Invoke a tool by its server-side name.
    #[instrument(skip(self, arguments), fields(server = %self.name))]
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<ToolOutput> {
        let call = async {
            let params = CallToolParams {
                name: tool.to_string(),
                arguments,
            };
            let value = self
                .request("tools/call", Some(serde_json::to_value(params)?))
                .await?;
            let result: CallToolResult = serde_json::from_value(value)?;
            Ok::<_, McpError>(result)
        };

        let result = call.await.map_err(|e| MarqueeError::ToolCall {
            server: self.name.clone(),
            reason: format!("{}: {}", tool, e),
        })?;

        Ok(ToolOutput {
            text: result
                .content
                .iter()
                .map(ToolContent::render)
                .collect::<Vec<_>>()
                .join("\n"),
            is_error: result.is_error,
        })
    }

    /// Close the connection and stop the server process.
    pub async fn shutdown(&self) {
        let mut connection = self.connection.lock().await;
        connection.transport.close().await;
        debug!("Closed MCP server '{}'", self.name);
    }
}
