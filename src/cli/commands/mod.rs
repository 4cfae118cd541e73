//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod tools;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use tools::run_tools;

use crate::agent::AgentResponse;
use crate::bootstrap::{self, Runtime};
use crate::cli::Output;
use crate::config::Settings;
use crate::storage::{TraceKind, TraceRecord};
use serde_json::json;
use tracing::warn;

/// Bootstrap the host behind a spinner.
async fn start_runtime(settings: &Settings) -> anyhow::Result<Runtime> {
    let spinner = Output::spinner("Discovering tools...");
    let started = bootstrap::start(settings).await;
    spinner.finish_and_clear();

    started.map_err(|e| {
        Output::error(&format!("{}", e));
        anyhow::Error::from(e)
    })
}

/// Record a completed run. Storage failures never fail the command.
async fn record_generation(runtime: &Runtime, key: &str, question: &str, response: &AgentResponse) {
    let tools: Vec<&str> = response.tool_calls.iter().map(|c| c.name.as_str()).collect();
    let trace = TraceRecord::new(
        TraceKind::Generation,
        Some(key),
        question,
        json!({
            "iterations": response.iterations,
            "tool_calls": tools,
            "failed_tool_calls": response.tool_calls.iter().filter(|c| c.is_error).count(),
            "answer_chars": response.content.chars().count(),
        }),
    );

    if let Err(e) = runtime.host.storage().record(&trace).await {
        warn!("Failed to record generation: {}", e);
    }
}
