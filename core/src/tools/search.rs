use crate::agent::compression::truncate_chars;
use crate::tools::{extract_string_arg, extract_usize_arg_opt};
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const SNIPPET_MAX_CHARS: usize = 200;
const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct SearchHit<'a> {
    title: &'a str,
    url: &'a str,
    content: String,
}

/// Web search through the Tavily API.
pub struct SearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl SearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: TAVILY_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn simplify_results(response: &TavilyResponse) -> anyhow::Result<String> {
    let hits: Vec<SearchHit<'_>> = response
        .results
        .iter()
        .map(|r| SearchHit {
            title: &r.title,
            url: &r.url,
            content: truncate_chars(&r.content, SNIPPET_MAX_CHARS),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&hits)?)
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Use this when you need to look up recent events, facts, or any information that may not be in the model's training data."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string."
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return.",
                    "default": DEFAULT_MAX_RESULTS
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let Some(api_key) = &self.api_key else {
            return Ok(ToolResult::output(
                json!({"error": "TAVILY_KEY not found in environment"}).to_string(),
            ));
        };

        let query = extract_string_arg(&args, "query")?;
        let max_results = extract_usize_arg_opt(&args, "max_results", DEFAULT_MAX_RESULTS);
        debug!(%query, max_results, "Searching");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let body: TavilyResponse = response.json().await?;
        Ok(ToolResult::output(simplify_results(&body)?))
    }
}
