//! Host bookkeeping storage.
//!
//! Records what the host did (agent registration, tool discovery, generations)
//! as trace rows. Agent logic never reads or writes it.

mod sqlite;

pub use sqlite::SqliteTelemetryStore;

use crate::config::Settings;
use crate::error::{MarqueeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Where the store keeps its data, parsed from the storage URL.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageTarget {
    /// Lives and dies with the process.
    Memory,
    /// SQLite file that survives restarts.
    File(PathBuf),
}

impl FromStr for StorageTarget {
    type Err = MarqueeError;

    fn from_str(url: &str) -> Result<Self> {
        let url = url.trim();
        if url == ":memory:" || url == "file::memory:" {
            return Ok(StorageTarget::Memory);
        }

        let path = url
            .strip_prefix("file://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);

        if path.is_empty() {
            return Err(MarqueeError::Config(format!(
                "storage url '{}' does not name a file",
                url
            )));
        }

        Ok(StorageTarget::File(Settings::expand_path(path)))
    }
}

impl std::fmt::Display for StorageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageTarget::Memory => write!(f, ":memory:"),
            StorageTarget::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Kind of host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    AgentRegistered,
    ToolsDiscovered,
    Generation,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::AgentRegistered => "agent_registered",
            TraceKind::ToolsDiscovered => "tools_discovered",
            TraceKind::Generation => "generation",
        }
    }
}

impl FromStr for TraceKind {
    type Err = MarqueeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "agent_registered" => Ok(TraceKind::AgentRegistered),
            "tools_discovered" => Ok(TraceKind::ToolsDiscovered),
            "generation" => Ok(TraceKind::Generation),
            _ => Err(MarqueeError::Storage(format!("unknown trace kind: {}", s))),
        }
    }
}

/// One host event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub id: Uuid,
    pub kind: TraceKind,
    /// Agent key the event concerns, if any.
    pub agent: Option<String>,
    pub message: String,
    /// Free-form structured details.
    pub attributes: Value,
    pub created_at: DateTime<Utc>,
}

impl TraceRecord {
    pub fn new(kind: TraceKind, agent: Option<&str>, message: impl Into<String>, attributes: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            agent: agent.map(str::to_string),
            message: message.into(),
            attributes,
            created_at: Utc::now(),
        }
    }
}

/// Trait for telemetry store implementations.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Append a record.
    async fn record(&self, trace: &TraceRecord) -> Result<()>;

    /// Most recent records first.
    async fn recent(&self, limit: usize) -> Result<Vec<TraceRecord>>;

    /// Records of one kind, most recent first.
    async fn by_kind(&self, kind: TraceKind, limit: usize) -> Result<Vec<TraceRecord>>;

    /// Total record count.
    async fn count(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_target() {
        assert_eq!(":memory:".parse::<StorageTarget>().unwrap(), StorageTarget::Memory);
        assert_eq!(
            "file:../marquee.db".parse::<StorageTarget>().unwrap(),
            StorageTarget::File(PathBuf::from("../marquee.db"))
        );
        assert_eq!(
            "file:///var/lib/marquee.db".parse::<StorageTarget>().unwrap(),
            StorageTarget::File(PathBuf::from("/var/lib/marquee.db"))
        );
        assert_eq!(
            "data/marquee.db".parse::<StorageTarget>().unwrap(),
            StorageTarget::File(PathBuf::from("data/marquee.db"))
        );
        assert!("file:".parse::<StorageTarget>().is_err());
    }

    #[test]
    fn test_trace_kind_names() {
        for kind in [
            TraceKind::AgentRegistered,
            TraceKind::ToolsDiscovered,
            TraceKind::Generation,
        ] {
            assert_eq!(kind.as_str().parse::<TraceKind>().unwrap(), kind);
        }
        assert!("eval".parse::<TraceKind>().is_err());
    }
}
