use crate::agent::compression::truncate_chars;
use crate::tools::{extract_string_arg_opt, extract_usize_arg_opt};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_MAX_LENGTH: usize = 8000;
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Fetches a URL and returns the first `max_length` characters of the body.
pub struct WebFetchTool {
    client: reqwest::Client,
}

impl WebFetchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("minimanus/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for WebFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn name(&self) -> &str {
        "webfetch"
    }

    fn description(&self) -> &str {
        "Fetch content from a URL. Use this to get the content of web pages when you need specific information from a website."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "max_length": {
                    "type": "integer",
                    "description": "Maximum characters to return",
                    "default": DEFAULT_MAX_LENGTH
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let url = extract_string_arg_opt(&args, "url", "");
        if url.trim().is_empty() {
            return Ok(ToolResult::error("url is required"));
        }
        let max_length = extract_usize_arg_opt(&args, "max_length", DEFAULT_MAX_LENGTH);

        let body = self.client.get(url.trim()).send().await?.text().await?;
        Ok(ToolResult::output(truncate_chars(&body, max_length)))
    }
}
