use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest<'a> {
    id: &'a str,
    r#type: &'a str,
    function: OpenAIFunctionRequest<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionRequest<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAITool<'a> {
    r#type: &'a str,
    function: OpenAIToolFunction<'a>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: Option<String>,
    function: OpenAIFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<serde_json::Value>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT_SECS),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 1.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.client = build_client(timeout_secs);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn convert_messages<'a>(messages: &'a [ChatMessage]) -> Vec<OpenAIMessage<'a>> {
        messages
            .iter()
            .map(|m| {
                let tool_calls = m.tool_calls.as_ref().map(|tool_calls| {
                    tool_calls
                        .iter()
                        .map(|tc| OpenAIToolCallRequest {
                            id: &tc.id,
                            r#type: "function",
                            function: OpenAIFunctionRequest {
                                name: &tc.name,
                                arguments: &tc.arguments,
                            },
                        })
                        .collect()
                });

                OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                    tool_calls,
                    tool_call_id: m.tool_call_id.as_deref(),
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<OpenAITool<'_>> {
        tools
            .iter()
            .map(|t| OpenAITool {
                r#type: "function",
                function: OpenAIToolFunction {
                    name: &t.name,
                    description: &t.description,
                    parameters: &t.parameters,
                },
            })
            .collect()
    }

    fn parse_response(body: OpenAIResponse) -> anyhow::Result<ChatResponse> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                id: c.id.unwrap_or_default(),
                name: c.function.name,
                // some gateways send arguments as an object instead of a string
                arguments: match c.function.arguments {
                    Some(serde_json::Value::String(s)) => s,
                    Some(serde_json::Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                },
            })
            .collect();

        Ok(ChatResponse {
            text: choice.message.content,
            tool_calls,
        })
    }
}

fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(30)))
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let tools = request.tools.map(Self::convert_tools);
        let tool_choice = tools.as_ref().map(|_| request.tool_choice.to_value());

        let openai_request = OpenAIRequest {
            model: &self.model,
            messages: Self::convert_messages(request.messages),
            temperature: self.temperature,
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "OpenAI API error");
            return Err(anyhow::anyhow!(
                "OpenAI API error {}: {}",
                status,
                error_text
            ));
        }

        let body: OpenAIResponse = response.json().await?;
        let parsed = Self::parse_response(body)?;
        debug!(
            tool_calls = parsed.tool_calls.len(),
            has_text = parsed.text.is_some(),
            "Received completion"
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ToolChoice;
    use serde_json::json;

    #[test]
    fn parses_tool_calls_with_string_and_object_arguments() {
        let body: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "calculator", "arguments": "{\"expression\":\"2**10\"}"}},
                        {"type": "function", "function": {"name": "terminate", "arguments": {"final": "1024"}}}
                    ]
                }
            }]
        }))
        .unwrap();

        let response = OpenAIProvider::parse_response(body).unwrap();
        assert!(response.text.is_none());
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].id, "c1");
        assert_eq!(response.tool_calls[0].arguments, "{\"expression\":\"2**10\"}");
        assert_eq!(response.tool_calls[1].id, "");
        assert_eq!(response.tool_calls[1].arguments, "{\"final\":\"1024\"}");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let body: OpenAIResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(OpenAIProvider::parse_response(body).is_err());
    }

    #[test]
    fn request_serializes_tools_and_choice() {
        let messages = [
            ChatMessage::system("sys"),
            ChatMessage::assistant_with_tool_calls("", vec![ToolCall::new("c1", "datetime", "{}")]),
            ChatMessage::tool_result("c1".into(), "2024-01-01"),
        ];
        let tools = [ToolSpec {
            name: "datetime".into(),
            description: "now".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];

        let request = OpenAIRequest {
            model: "m",
            messages: OpenAIProvider::convert_messages(&messages),
            temperature: 1.0,
            tools: Some(OpenAIProvider::convert_tools(&tools)),
            tool_choice: Some(ToolChoice::Auto.to_value()),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["tools"][0]["function"]["name"], "datetime");
        assert_eq!(value["messages"][1]["tool_calls"][0]["function"]["name"], "datetime");
        assert_eq!(value["messages"][2]["role"], "tool");
        assert_eq!(value["messages"][2]["tool_call_id"], "c1");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAIProvider::new("k").with_base_url("http://localhost:11434/v1/");
        assert_eq!(provider.base_url(), "http://localhost:11434/v1");
    }
}
