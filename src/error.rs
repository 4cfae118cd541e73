//! Error types for Marquee.

use thiserror::Error;

/// Library-level error type for Marquee operations.
#[derive(Error, Debug)]
pub enum MarqueeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool discovery failed for server '{server}': {reason}")]
    ToolDiscovery { server: String, reason: String },

    #[error("Tool call failed on server '{server}': {reason}")]
    ToolCall { server: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Agent not registered: {0}")]
    AgentNotFound(String),
}

impl MarqueeError {
    /// Build a discovery error for the named server.
    pub fn discovery(server: &str, reason: impl std::fmt::Display) -> Self {
        MarqueeError::ToolDiscovery {
            server: server.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for Marquee operations.
pub type Result<T> = std::result::Result<T, MarqueeError>;
