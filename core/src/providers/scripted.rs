use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolChoice, ToolSpec};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
}

/// Replays queued responses in order and records every request.
/// Once the queue is empty, `fallback` (if any) is returned forever.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<anyhow::Result<ChatResponse>>>,
    fallback: Option<ChatResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: impl IntoIterator<Item = anyhow::Result<ChatResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new([])
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.map(<[ToolSpec]>::to_vec).unwrap_or_default(),
            tool_choice: request.tool_choice.clone(),
        });

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| anyhow::anyhow!("scripted provider ran out of responses")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
