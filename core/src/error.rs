use thiserror::Error;

/// Fatal outcomes of an agent run. Tool-internal failures never show up
/// here; they are fed back to the model as tool output instead.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool arguments for {tool}: {arguments}")]
    InvalidToolArguments {
        tool: String,
        arguments: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Agent exceeded max_steps={max_steps} without termination")]
    BudgetExhausted { max_steps: usize },

    #[error("Completion client failed: {0}")]
    CompletionClient(#[source] anyhow::Error),

    #[error("History store failed: {0}")]
    History(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
