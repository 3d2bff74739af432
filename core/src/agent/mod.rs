pub mod compression;
pub mod context;
pub mod conversation;
pub mod loop_;
pub mod profile;
pub mod registry;

pub use compression::Compressor;
pub use context::ContextBuilder;
pub use conversation::Conversation;
pub use loop_::{AgentLoop, Exit, RunOutcome, ToolTranscript};
pub use profile::{Profile, build_agent, build_registry};
pub use registry::ToolRegistry;
