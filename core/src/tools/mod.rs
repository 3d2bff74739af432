use serde_json::Value;

pub mod calculator;
pub mod datetime;
pub mod mcp;
pub mod search;
pub mod skill;
pub mod terminate;
pub mod webfetch;

pub use calculator::CalculatorTool;
pub use datetime::DateTimeTool;
pub use mcp::{McpServer, McpServerConfig, McpTool, load_mcp_tools, load_mcp_tools_from};
pub use search::SearchTool;
pub use skill::SkillTool;
pub use terminate::TerminateTool;
pub use webfetch::WebFetchTool;

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

pub fn extract_string_arg_opt(args: &Value, key: &str, default: &str) -> String {
    args.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

pub fn extract_usize_arg_opt(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}
