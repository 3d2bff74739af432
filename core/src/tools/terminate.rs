use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Ends the run; `final` becomes the run's answer.
pub struct TerminateTool;

#[async_trait]
impl Tool for TerminateTool {
    fn name(&self) -> &str {
        "terminate"
    }

    fn description(&self) -> &str {
        "End the agent loop and return the final answer."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "final": {
                    "type": "string",
                    "description": "The final answer to show the user before exiting."
                }
            },
            "required": ["final"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let answer = match args.get("final") {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(ToolResult::terminate(answer))
    }
}
