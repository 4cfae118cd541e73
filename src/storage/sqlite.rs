//! SQLite-backed telemetry store.

use super::{StorageTarget, TelemetryStore, TraceKind, TraceRecord};
use crate::error::{MarqueeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS traces (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    agent TEXT,
    message TEXT NOT NULL,
    attributes TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_traces_kind ON traces(kind);
CREATE INDEX IF NOT EXISTS idx_traces_created_at ON traces(created_at);
"#;

type TraceRow = (String, String, Option<String>, String, String, String);

/// SQLite telemetry store, in memory or on disk.
pub struct SqliteTelemetryStore {
    conn: Mutex<Connection>,
    target: StorageTarget,
}

impl SqliteTelemetryStore {
    /// Open the store a storage URL points at.
    pub fn open(url: &str) -> Result<Self> {
        Self::open_target(url.parse()?)
    }

    /// Open a store for an already parsed target.
    #[instrument(skip_all, fields(target = %target))]
    pub fn open_target(target: StorageTarget) -> Result<Self> {
        let conn = match &target {
            StorageTarget::Memory => Connection::open_in_memory()?,
            StorageTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let conn = Connection::open(path)?;
                conn.execute_batch("PRAGMA journal_mode=WAL;")?;
                conn
            }
        };

        conn.execute_batch(SCHEMA)?;
        info!("Initialized telemetry store at {}", target);

        Ok(Self {
            conn: Mutex::new(conn),
            target,
        })
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::open_target(StorageTarget::Memory)
    }

    pub fn target(&self) -> &StorageTarget {
        &self.target
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| MarqueeError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_trace(row: &Row<'_>) -> rusqlite::Result<TraceRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn decode((id, kind, agent, message, attributes, created_at): TraceRow) -> Result<TraceRecord> {
        Ok(TraceRecord {
            id: uuid::Uuid::parse_str(&id)
                .map_err(|e| MarqueeError::Storage(format!("bad trace id '{}': {}", id, e)))?,
            kind: kind.parse()?,
            agent,
            message,
            attributes: serde_json::from_str(&attributes)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    MarqueeError::Storage(format!("bad timestamp '{}': {}", created_at, e))
                })?,
        })
    }
}

#[async_trait]
impl TelemetryStore for SqliteTelemetryStore {
    #[instrument(skip(self, trace), fields(kind = trace.kind.as_str()))]
    async fn record(&self, trace: &TraceRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO traces (id, kind, agent, message, attributes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                trace.id.to_string(),
                trace.kind.as_str(),
                trace.agent,
                trace.message,
                serde_json::to_string(&trace.attributes)?,
                trace.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;

        debug!("Recorded trace {}", trace.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, limit: usize) -> Result<Vec<TraceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kind, agent, message, attributes, created_at
            FROM traces
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt
            .query_map(params![limit as i64], Self::row_to_trace)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::decode).collect()
    }

    #[instrument(skip(self))]
    async fn by_kind(&self, kind: TraceKind, limit: usize) -> Result<Vec<TraceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, kind, agent, message, attributes, created_at
            FROM traces
            WHERE kind = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(params![kind.as_str(), limit as i64], Self::row_to_trace)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::decode).collect()
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM traces", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generation(message: &str) -> TraceRecord {
        TraceRecord::new(
            TraceKind::Generation,
            Some("movieAgent"),
            message,
            json!({"tool_calls": 1}),
        )
    }

    #[tokio::test]
    async fn test_record_and_query() {
        let store = SqliteTelemetryStore::in_memory().unwrap();
        store
            .record(&TraceRecord::new(
                TraceKind::AgentRegistered,
                Some("movieAgent"),
                "registered",
                json!({}),
            ))
            .await
            .unwrap();
        store.record(&generation("first")).await.unwrap();
        store.record(&generation("second")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 3);

        let generations = store.by_kind(TraceKind::Generation, 10).await.unwrap();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations[0].message, "second");
        assert_eq!(generations[0].agent.as_deref(), Some("movieAgent"));
        assert_eq!(generations[0].attributes, json!({"tool_calls": 1}));

        let recent = store.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_does_not_survive_reopen() {
        {
            let store = SqliteTelemetryStore::open(":memory:").unwrap();
            store.record(&generation("gone")).await.unwrap();
            assert_eq!(store.count().await.unwrap(), 1);
        }

        let reopened = SqliteTelemetryStore::open(":memory:").unwrap();
        assert_eq!(reopened.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file:{}", dir.path().join("db").join("marquee.db").display());

        {
            let store = SqliteTelemetryStore::open(&url).unwrap();
            store.record(&generation("kept")).await.unwrap();
        }

        let reopened = SqliteTelemetryStore::open(&url).unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.recent(10).await.unwrap()[0].message, "kept");
        assert!(matches!(reopened.target(), StorageTarget::File(_)));
    }
}
