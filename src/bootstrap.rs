//! Process startup: storage, tool discovery and agent registration.

use crate::agent::{Agent, AgentConfig, AgentRunner};
use crate::config::Settings;
use crate::error::Result;
use crate::host::Host;
use crate::mcp::ToolRegistry;
use crate::storage::{SqliteTelemetryStore, TelemetryStore, TraceKind, TraceRecord};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything a command needs once startup has finished.
pub struct Runtime {
    pub host: Host,
    pub registry: Arc<ToolRegistry>,
}

impl Runtime {
    /// Runner for a registered agent, routing tool calls through the registry.
    pub fn runner(&self, key: &str) -> Result<AgentRunner> {
        AgentRunner::new(self.host.agent(key)?, self.registry.clone())
    }

    /// Stop the tool server processes.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

/// Start the host described by `settings`.
///
/// Discovery completes before the agent is built, so a registered agent
/// always carries the full tool set. Any discovery failure aborts startup.
#[instrument(skip_all, fields(agent = %settings.agent.key))]
pub async fn start(settings: &Settings) -> Result<Runtime> {
    let config = AgentConfig::from_settings(settings)?;
    let storage: Arc<dyn TelemetryStore> =
        Arc::new(SqliteTelemetryStore::open(&settings.storage.url)?);

    let registry = Arc::new(ToolRegistry::discover(&settings.mcp.servers).await?);
    let tools = registry.tools();
    info!(
        "Discovered {} tools across {} servers",
        tools.len(),
        registry.servers().count()
    );

    let host = match register(settings, config, &registry, storage).await {
        Ok(host) => host,
        Err(e) => {
            registry.shutdown().await;
            return Err(e);
        }
    };

    Ok(Runtime { host, registry })
}

async fn register(
    settings: &Settings,
    config: AgentConfig,
    registry: &ToolRegistry,
    storage: Arc<dyn TelemetryStore>,
) -> Result<Host> {
    let tools = registry.tools();

    storage
        .record(&TraceRecord::new(
            TraceKind::ToolsDiscovered,
            None,
            format!("discovered {} tools", tools.len()),
            json!({
                "servers": registry.servers().collect::<Vec<_>>(),
                "tools": tools.names(),
            }),
        ))
        .await?;

    let agent = Agent::new(config, tools)?;

    Host::builder()
        .logger(settings.logger.clone())
        .storage(storage)
        .agent(&settings.agent.key, agent)
        .build()
        .await
}
