use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A request from a tool to change the system turn before the next step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub key: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub terminates: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextUpdate>,
}

impl ToolResult {
    pub fn output(output: impl Into<String>) -> Self {
        Self {
            terminates: false,
            output: output.into(),
            context: None,
        }
    }

    /// Domain failures are reported back to the model as plain output.
    pub fn error(error: impl std::fmt::Display) -> Self {
        Self::output(format!("Error: {}", error))
    }

    pub fn terminate(output: impl Into<String>) -> Self {
        Self {
            terminates: true,
            output: output.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, body: impl Into<String>) -> Self {
        self.context = Some(ContextUpdate {
            key: key.into(),
            body: body.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// `Err` is treated as a recoverable tool failure, not a run failure.
    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
