pub mod factory;
pub mod memory;
pub mod sqlite;

pub use factory::create_history;
pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
