//! Configuration module for Marquee.
//!
//! Handles loading and managing application settings and the default agent prompt.

mod prompts;
mod settings;

pub use prompts::DEFAULT_INSTRUCTIONS;
pub use settings::{
    expand_env, AgentSettings, LoggerSettings, McpServerSettings, McpSettings, ModelSettings,
    Settings, StorageSettings,
};
