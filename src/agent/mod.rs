//! The movie assistant agent.
//!
//! An [`Agent`] bundles a name, instructions, a model reference and the tools
//! discovered from MCP servers. [`AgentRunner`] drives it through the
//! chat-completions tool calling loop.

mod definition;
mod runner;
mod tools;

pub use definition::{Agent, AgentConfig};
pub use runner::{AgentResponse, AgentRunner, History, ToolCallRecord};
pub use tools::{parse_arguments, tool_definitions, ToolInvoker};
