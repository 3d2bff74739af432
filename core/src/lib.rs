pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod skills;
pub mod tools;
pub mod traits;

pub use agent::{
    AgentLoop, Compressor, ContextBuilder, Conversation, Exit, Profile, RunOutcome,
    ToolRegistry, ToolTranscript, build_registry,
};
pub use config::*;
pub use error::AgentError;
pub use history::{InMemoryHistoryStore, SqliteHistoryStore, create_history};
pub use providers::{OpenAIProvider, create_provider};
pub use skills::*;
pub use tools::*;
pub use traits::*;
