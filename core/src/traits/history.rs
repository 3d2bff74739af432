use crate::traits::{ChatMessage, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl From<HistoryRecord> for ChatMessage {
    fn from(record: HistoryRecord) -> Self {
        ChatMessage::new(record.role, record.content)
    }
}

/// Persisted conversation history keyed by an opaque session id.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, session_id: &str, role: Role, content: &str) -> anyhow::Result<()>;

    /// Most recent `limit` records, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> anyhow::Result<Vec<HistoryRecord>>;

    async fn count(&self, session_id: &str) -> anyhow::Result<usize>;

    /// Returns the number of removed records.
    async fn clear(&self, session_id: &str) -> anyhow::Result<usize>;
}
