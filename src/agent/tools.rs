//! Bridge between discovered MCP tools and model function calling.

use crate::error::{MarqueeError, Result};
use crate::mcp::{ToolOutput, ToolSet};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use async_trait::async_trait;
use serde_json::Value;

/// Executes a tool by its qualified name.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &str, arguments: Value) -> Result<ToolOutput>;
}

/// Get OpenAI function/tool definitions for a tool set.
pub fn tool_definitions(tools: &ToolSet) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|(name, descriptor)| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: name.to_string(),
                description: descriptor.description.clone(),
                parameters: Some(descriptor.input_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Parse the JSON arguments string the model produced for a tool call.
pub fn parse_arguments(arguments: &str) -> Result<Value> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_json::from_str(arguments)
        .map_err(|e| MarqueeError::Agent(format!("Invalid tool arguments: {}", e)))?;

    if !value.is_object() {
        return Err(MarqueeError::Agent(format!(
            "Tool arguments must be a JSON object, got: {}",
            arguments
        )));
    }
    Ok(value)
}
