use crate::traits::{HistoryRecord, HistoryStore, Role};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryHistoryStore {
    sessions: Mutex<HashMap<String, Vec<HistoryRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        self.sessions
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(HistoryRecord {
                role,
                content: content.to_string(),
                created_at: Utc::now().to_rfc3339(),
            });
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let sessions = self.sessions.lock().await;
        let records = sessions.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = records.len().saturating_sub(limit);
        Ok(records[start..].to_vec())
    }

    async fn count(&self, session_id: &str) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .await
            .get(session_id)
            .map_or(0, Vec::len))
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .await
            .remove(session_id)
            .map_or(0, |records| records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_tail_in_order() {
        let store = InMemoryHistoryStore::new();
        for content in ["one", "two", "three"] {
            store.append("s", Role::User, content).await.unwrap();
        }

        let recent = store.recent("s", 2).await.unwrap();
        assert_eq!(recent[0].content, "two");
        assert_eq!(recent[1].content, "three");
        assert!(store.recent("other", 5).await.unwrap().is_empty());
        assert_eq!(store.clear("s").await.unwrap(), 3);
        assert_eq!(store.count("s").await.unwrap(), 0);
    }
}
