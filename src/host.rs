//! Host orchestrator: holds registered agents with their logger and storage.

use crate::agent::Agent;
use crate::config::LoggerSettings;
use crate::error::{MarqueeError, Result};
use crate::storage::{SqliteTelemetryStore, TelemetryStore, TraceKind, TraceRecord};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Owns the agents for the life of the process.
pub struct Host {
    agents: BTreeMap<String, Arc<Agent>>,
    storage: Arc<dyn TelemetryStore>,
    logger: LoggerSettings,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Look up a registered agent.
    pub fn agent(&self, key: &str) -> Result<Arc<Agent>> {
        self.agents
            .get(key)
            .cloned()
            .ok_or_else(|| MarqueeError::AgentNotFound(key.to_string()))
    }

    /// Registered agents in key order.
    pub fn agents(&self) -> impl Iterator<Item = (&str, &Arc<Agent>)> {
        self.agents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn storage(&self) -> Arc<dyn TelemetryStore> {
        self.storage.clone()
    }

    pub fn logger(&self) -> &LoggerSettings {
        &self.logger
    }
}

/// Collects agents and collaborators for a [`Host`].
#[derive(Default)]
pub struct HostBuilder {
    agents: Vec<(String, Agent)>,
    storage: Option<Arc<dyn TelemetryStore>>,
    logger: Option<LoggerSettings>,
}

impl HostBuilder {
    /// Register an agent under `key`.
    pub fn agent(mut self, key: &str, agent: Agent) -> Self {
        self.agents.push((key.to_string(), agent));
        self
    }

    /// Storage for host bookkeeping. Defaults to an in-memory store.
    pub fn storage(mut self, storage: Arc<dyn TelemetryStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn logger(mut self, logger: LoggerSettings) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Register everything, recording one trace per agent.
    pub async fn build(self) -> Result<Host> {
        let storage: Arc<dyn TelemetryStore> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(SqliteTelemetryStore::in_memory()?),
        };

        let mut agents = BTreeMap::new();
        for (key, agent) in self.agents {
            if key.trim().is_empty() {
                return Err(MarqueeError::Config("agent key must not be empty".to_string()));
            }
            if agents.contains_key(&key) {
                return Err(MarqueeError::Config(format!(
                    "agent key '{}' is registered twice",
                    key
                )));
            }

            storage
                .record(&TraceRecord::new(
                    TraceKind::AgentRegistered,
                    Some(&key),
                    format!("registered agent '{}'", agent.name()),
                    json!({
                        "name": agent.name(),
                        "model": agent.model(),
                        "tools": agent.tools().names(),
                    }),
                ))
                .await?;

            info!(
                "Registered agent '{}' as {} ({} tools, model {})",
                agent.name(),
                key,
                agent.tools().len(),
                agent.model()
            );
            agents.insert(key, Arc::new(agent));
        }

        Ok(Host {
            agents,
            storage,
            logger: self.logger.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::mcp::{ToolDescriptor, ToolSet};

    fn agent(name: &str) -> Agent {
        let tools = ToolSet::new(vec![ToolDescriptor {
            server: "moviemcp".to_string(),
            name: "get_trending".to_string(),
            description: None,
            input_schema: json!({"type": "object"}),
        }])
        .unwrap();

        Agent::new(
            AgentConfig {
                name: name.to_string(),
                instructions: "Recommend movies.".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                max_iterations: 5,
            },
            Arc::new(tools),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let storage = Arc::new(SqliteTelemetryStore::in_memory().unwrap());
        let host = Host::builder()
            .logger(LoggerSettings {
                name: "Mastra".to_string(),
                level: "debug".to_string(),
            })
            .storage(storage.clone())
            .agent("movieAgent", agent("Movie Assistant"))
            .build()
            .await
            .unwrap();

        let movie_agent = host.agent("movieAgent").unwrap();
        assert_eq!(movie_agent.name(), "Movie Assistant");
        assert_eq!(host.logger().name, "Mastra");
        assert_eq!(host.agents().count(), 1);

        let traces = storage.by_kind(TraceKind::AgentRegistered, 10).await.unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].agent.as_deref(), Some("movieAgent"));
        assert_eq!(traces[0].attributes["tools"], json!(["moviemcp_get_trending"]));
    }

    #[tokio::test]
    async fn test_unknown_agent() {
        let host = Host::builder().build().await.unwrap();
        let err = host.agent("movieAgent").unwrap_err();
        assert!(matches!(err, MarqueeError::AgentNotFound(_)));
        assert_eq!(host.logger().name, "Marquee");
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let result = Host::builder()
            .agent("movieAgent", agent("One"))
            .agent("movieAgent", agent("Two"))
            .build()
            .await;
        assert!(matches!(result, Err(MarqueeError::Config(_))));
    }
}
