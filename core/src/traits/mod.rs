pub mod history;
pub mod provider;
pub mod tool;

pub use history::{DEFAULT_SESSION, HistoryRecord, HistoryStore};
pub use provider::{ChatMessage, ChatRequest, ChatResponse, Provider, Role, ToolCall, ToolChoice};
pub use tool::{ContextUpdate, Tool, ToolResult, ToolSpec};
