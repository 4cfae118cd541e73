//! The agent value registered with the host.

use crate::config::Settings;
use crate::error::{MarqueeError, Result};
use crate::mcp::ToolSet;
use std::sync::Arc;

/// Inputs for building an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub max_iterations: usize,
}

impl AgentConfig {
    /// Build from settings, resolving the instructions file if configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.model.provider != "openai" {
            return Err(MarqueeError::Config(format!(
                "unsupported model provider '{}' (only 'openai' is available)",
                settings.model.provider
            )));
        }

        Ok(Self {
            name: settings.agent.name.clone(),
            instructions: settings.agent.resolve_instructions()?,
            model: settings.model.name.clone(),
            max_iterations: settings.model.max_iterations,
        })
    }
}

/// A named bundle of instructions, a model reference and a tool set.
///
/// Immutable once built; the host shares it as `Arc<Agent>`.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    model: String,
    max_iterations: usize,
    tools: Arc<ToolSet>,
}

impl Agent {
    /// Create an agent. The tool set must come from a completed discovery.
    pub fn new(config: AgentConfig, tools: Arc<ToolSet>) -> Result<Self> {
        if config.name.trim().is_empty() {
            return Err(MarqueeError::Config("agent name must not be empty".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(MarqueeError::Config("model name must not be empty".to_string()));
        }
        if config.max_iterations == 0 {
            return Err(MarqueeError::Config(
                "model.max_iterations must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            name: config.name,
            instructions: config.instructions,
            model: config.model,
            max_iterations: config.max_iterations,
            tools,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }
}
