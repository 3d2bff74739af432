//! SQLite-backed conversation history.

use crate::traits::{HistoryRecord, HistoryStore, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        session_id TEXT NOT NULL DEFAULT 'default'
    );

    CREATE INDEX IF NOT EXISTS idx_session_created ON messages(session_id, created_at);
"#;

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite history store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Useful for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire lock: {}", e))
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO messages (role, content, created_at, session_id) VALUES (?1, ?2, ?3, ?4)",
            params![role.as_str(), content, Utc::now().to_rfc3339(), session_id],
        )?;
        debug!(session = session_id, role = role.as_str(), "Appended history record");
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM messages
             WHERE session_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![session_id, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut records = rows
            .into_iter()
            .map(|(role, content, created_at)| {
                Ok(HistoryRecord {
                    role: role.parse()?,
                    content,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        records.reverse();
        Ok(records)
    }

    async fn count(&self, session_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM messages WHERE session_id = ?1",
            params![session_id],
        )?;
        info!(session = session_id, removed, "Cleared history");
        Ok(removed)
    }
}
