//! Tools discovered from remote MCP servers over HTTP JSON-RPC.
//!
//! Servers are listed in a JSON file:
//!
//! ```json
//! {"mcp_servers": [{"name": "amap", "url": "https://...", "env_key": "AMAP_KEY"}]}
//! ```
//!
//! A server whose credential is missing, or whose listing fails, simply
//! contributes no tools.

use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const DEFAULT_ACCEPT: &str = "application/json, text/event-stream";
const MCP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("No API key configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Environment variable holding the credential.
    #[serde(default)]
    pub env_key: String,
    #[serde(default)]
    pub accept: Option<String>,
    /// Scheme for the `Authorization` header, e.g. `Bearer`. Without it
    /// the credential is sent in a header named after `env_key`.
    #[serde(default)]
    pub auth_header: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct McpServersFile {
    #[serde(default)]
    mcp_servers: Vec<McpServerConfig>,
}

pub fn load_mcp_servers(path: &Path) -> anyhow::Result<Vec<McpServerConfig>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let content = std::fs::read_to_string(path)?;
    let file: McpServersFile = serde_json::from_str(&content)?;
    Ok(file.mcp_servers)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default = "default_schema")]
    pub input_schema: Value,
}

fn default_schema() -> Value {
    json!({"type": "object"})
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Parses either a plain JSON-RPC body or a single SSE event whose `data:`
/// line carries the JSON-RPC payload.
pub fn parse_rpc_body(body: &str) -> Result<JsonRpcResponse, McpError> {
    let body = body.trim();

    if body.starts_with("event:") || body.starts_with("data:") {
        let data = body
            .lines()
            .find_map(|line| line.strip_prefix("data:"))
            .ok_or_else(|| McpError::Protocol("SSE response without data".into()))?;
        return Ok(serde_json::from_str(data.trim())?);
    }

    Ok(serde_json::from_str(body)?)
}

/// Text of the first content part, the error payload, or the raw response.
pub fn render_call_result(response: &JsonRpcResponse) -> String {
    if let Some(result) = &response.result {
        let parsed: ToolCallResult = serde_json::from_value(result.clone()).unwrap_or_default();
        if let Some(first) = parsed.content.first()
            && first.content_type == "text"
        {
            return first.text.clone().unwrap_or_default();
        }
    }

    if let Some(error) = &response.error {
        return format!("MCP error: {}", error);
    }

    serde_json::to_string(response).unwrap_or_default()
}

fn invalid_header(e: impl std::fmt::Display) -> McpError {
    McpError::Protocol(format!("invalid header: {}", e))
}

pub struct McpServer {
    config: McpServerConfig,
    api_key: Option<String>,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl McpServer {
    pub fn new(config: McpServerConfig, api_key: Option<String>) -> Self {
        Self {
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(MCP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_env(config: McpServerConfig) -> Self {
        Self::from_lookup(config, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(config: McpServerConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = if config.env_key.is_empty() {
            None
        } else {
            lookup(&config.env_key)
        };
        Self::new(config, api_key)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, McpError> {
        let mut headers = HeaderMap::new();
        let accept = self.config.accept.as_deref().unwrap_or(DEFAULT_ACCEPT);
        headers.insert(ACCEPT, HeaderValue::from_str(accept).map_err(invalid_header)?);

        match self.config.auth_header.as_deref().filter(|s| !s.is_empty()) {
            Some(scheme) => {
                let value = format!("{} {}", scheme, api_key);
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&value).map_err(invalid_header)?,
                );
            }
            None if !self.config.env_key.is_empty() => {
                let name = HeaderName::from_bytes(self.config.env_key.as_bytes())
                    .map_err(invalid_header)?;
                headers.insert(name, HeaderValue::from_str(api_key).map_err(invalid_header)?);
            }
            None => {}
        }

        Ok(headers)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<JsonRpcResponse, McpError> {
        let api_key = self.api_key.as_deref().ok_or(McpError::MissingApiKey)?;
        let request = JsonRpcRequest::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);

        debug!(server = %self.config.name, method, "MCP request");
        let body = self
            .client
            .post(&self.config.url)
            .headers(self.headers(api_key)?)
            .json(&request)
            .send()
            .await?
            .text()
            .await?;

        parse_rpc_body(&body)
    }

    /// Without a credential the server offers nothing and no request is made.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        if self.api_key.is_none() {
            debug!(server = %self.config.name, env_key = %self.config.env_key, "No credential, skipping");
            return Ok(vec![]);
        }

        let response = self.rpc("tools/list", json!({})).await?;
        let tools = response
            .result
            .and_then(|r| r.get("tools").cloned())
            .map(serde_json::from_value::<Vec<McpToolDefinition>>)
            .transpose()?
            .unwrap_or_default();
        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<JsonRpcResponse, McpError> {
        self.rpc("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }
}

pub struct McpTool {
    server: Arc<McpServer>,
    definition: McpToolDefinition,
}

impl McpTool {
    pub fn new(server: Arc<McpServer>, definition: McpToolDefinition) -> Self {
        Self { server, definition }
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        let schema = &self.definition.input_schema;
        json!({
            "type": "object",
            "properties": schema.get("properties").cloned().unwrap_or_else(|| json!({})),
            "required": schema.get("required").cloned().unwrap_or_else(|| json!([])),
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let response = self.server.call_tool(&self.definition.name, args).await?;
        Ok(ToolResult::output(render_call_result(&response)))
    }
}

/// Discovers tools from every configured server. Failures degrade to fewer
/// tools instead of aborting.
pub async fn load_mcp_tools(config_path: &Path) -> Vec<Arc<dyn Tool>> {
    load_mcp_tools_from(config_path, |key| std::env::var(key).ok()).await
}

/// Same as [`load_mcp_tools`] with credentials resolved through `lookup`.
pub async fn load_mcp_tools_from<F>(config_path: &Path, lookup: F) -> Vec<Arc<dyn Tool>>
where
    F: Fn(&str) -> Option<String>,
{
    let servers = match load_mcp_servers(config_path) {
        Ok(servers) => servers,
        Err(e) => {
            warn!(path = %config_path.display(), "Failed to read MCP server list: {}", e);
            return vec![];
        }
    };

    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    for config in servers {
        let server = Arc::new(McpServer::from_lookup(config, &lookup));
        match server.list_tools().await {
            Ok(definitions) => {
                info!(server = %server.name(), tools = definitions.len(), "Loaded MCP tools");
                tools.extend(definitions.into_iter().map(|definition| {
                    Arc::new(McpTool::new(server.clone(), definition)) as Arc<dyn Tool>
                }));
            }
            Err(e) => warn!(server = %server.name(), "Failed to list MCP tools: {}", e),
        }
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(env_key: &str) -> McpServerConfig {
        McpServerConfig {
            name: "amap".into(),
            url: "http://127.0.0.1:9/mcp".into(),
            description: String::new(),
            env_key: env_key.into(),
            accept: None,
            auth_header: None,
        }
    }

    #[test]
    fn parses_server_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mcp_servers.json");
        std::fs::write(
            &path,
            r#"{"mcp_servers": [
                {"name": "amap", "url": "https://mcp.amap.com/mcp", "env_key": "AMAP_KEY"},
                {"name": "github", "url": "https://api.githubcopilot.com/mcp/", "env_key": "GITHUB_TOKEN", "auth_header": "Bearer", "accept": "application/json"}
            ]}"#,
        )
        .unwrap();

        let servers = load_mcp_servers(&path).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].env_key, "AMAP_KEY");
        assert!(servers[0].auth_header.is_none());
        assert_eq!(servers[1].auth_header.as_deref(), Some("Bearer"));

        assert!(load_mcp_servers(&tmp.path().join("missing.json")).unwrap().is_empty());
    }

    #[test]
    fn parses_sse_and_plain_bodies() {
        let sse = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"tools\":[]}}\n\n";
        let response = parse_rpc_body(sse).unwrap();
        assert_eq!(response.result.unwrap()["tools"], json!([]));

        let plain = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}"#;
        let response = parse_rpc_body(plain).unwrap();
        assert_eq!(response.error.unwrap()["code"], -32601);

        assert!(parse_rpc_body("event: message\n\n").is_err());
    }

    #[test]
    fn renders_first_text_part_or_error() {
        let ok: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "result": {"content": [{"type": "text", "text": "sunny, 21C"}, {"type": "text", "text": "ignored"}]}
        }))
        .unwrap();
        assert_eq!(render_call_result(&ok), "sunny, 21C");

        let err: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "error": {"code": 1, "message": "bad city"}
        }))
        .unwrap();
        assert!(render_call_result(&err).starts_with("MCP error: "));
        assert!(render_call_result(&err).contains("bad city"));
    }

    #[test]
    fn schema_keeps_only_properties_and_required() {
        let definition: McpToolDefinition = serde_json::from_value(json!({
            "name": "maps_weather",
            "description": "Weather by city",
            "inputSchema": {
                "type": "object",
                "properties": {"city": {"type": "string"}},
                "required": ["city"],
                "$schema": "http://json-schema.org/draft-07/schema#"
            }
        }))
        .unwrap();
        let tool = McpTool::new(Arc::new(McpServer::new(config("AMAP_KEY"), None)), definition);

        assert_eq!(tool.name(), "maps_weather");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], json!(["city"]));
        assert!(schema.get("$schema").is_none());
    }

    #[tokio::test]
    async fn missing_credential_lists_nothing() {
        let server = McpServer::new(config("AMAP_KEY"), Some("   ".into()));
        assert!(server.list_tools().await.unwrap().is_empty());
        assert!(matches!(
            server.call_tool("maps_weather", json!({})).await,
            Err(McpError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn unreachable_server_contributes_no_tools() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mcp_servers.json");
        std::fs::write(
            &path,
            r#"{"mcp_servers": [{"name": "amap", "url": "http://127.0.0.1:9/mcp", "env_key": "AMAP_KEY"}]}"#,
        )
        .unwrap();

        let lookup = |key: &str| (key == "AMAP_KEY").then(|| "secret".to_string());
        let server = McpServer::from_lookup(load_mcp_servers(&path).unwrap().remove(0), lookup);
        assert!(matches!(server.list_tools().await, Err(McpError::Http(_))));

        let tools = load_mcp_tools_from(&path, lookup).await;
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn malformed_server_file_contributes_no_tools() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mcp_servers.json");
        std::fs::write(&path, r#"{"mcp_servers": [{"name": "amap", "#).unwrap();

        assert!(load_mcp_servers(&path).is_err());
        let tools = load_mcp_tools_from(&path, |_: &str| Some("secret".to_string())).await;
        assert!(tools.is_empty());
    }

    #[test]
    fn auth_header_modes() {
        let server = McpServer::new(config("AMAP_KEY"), Some("k".into()));
        let headers = server.headers("k").unwrap();
        assert_eq!(headers.get("amap_key").unwrap(), "k");
        assert_eq!(headers.get(ACCEPT).unwrap(), DEFAULT_ACCEPT);

        let mut bearer = config("GITHUB_TOKEN");
        bearer.auth_header = Some("Bearer".into());
        let server = McpServer::new(bearer, Some("t".into()));
        let headers = server.headers("t").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer t");
        assert!(headers.get("github_token").is_none());
    }
}
