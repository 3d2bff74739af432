use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use chrono::Local;

pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time. Use this when you need to know the current time or date."
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::output(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[tokio::test]
    async fn returns_local_timestamp() {
        let result = DateTimeTool.execute(serde_json::json!({})).await.unwrap();
        assert!(!result.terminates);
        assert!(NaiveDateTime::parse_from_str(&result.output, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
