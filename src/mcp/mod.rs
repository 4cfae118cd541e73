//! MCP (Model Context Protocol) client for Marquee.
//!
//! Launches tool servers as child processes and speaks JSON-RPC 2.0 over
//! their stdio to discover and call tools.

mod client;
mod protocol;
mod registry;
mod tools;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::McpClient;
pub use protocol::Implementation;
pub use registry::ToolRegistry;
pub use tools::{ToolDescriptor, ToolOutput, ToolSet};
