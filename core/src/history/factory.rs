use crate::history::{InMemoryHistoryStore, SqliteHistoryStore};
use crate::traits::HistoryStore;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// SQLite-backed store at `db_path`, or a process-local one without a path.
pub fn create_history(db_path: Option<&Path>) -> Result<Arc<dyn HistoryStore>> {
    match db_path {
        Some(path) => Ok(Arc::new(SqliteHistoryStore::open(path)?)),
        None => Ok(Arc::new(InMemoryHistoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn factory_sqlite() {
        let tmp = TempDir::new().unwrap();
        let store = create_history(Some(&tmp.path().join("nested/messages.db"))).unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(tmp.path().join("nested/messages.db").exists());
    }

    #[test]
    fn factory_in_memory() {
        let store = create_history(None).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
