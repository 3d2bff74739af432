use crate::agent::compression::truncate_chars;
use crate::agent::{Compressor, ContextBuilder, Conversation, ToolRegistry};
use crate::error::{AgentError, Result};
use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, HistoryStore, Provider, Role, ToolCall, ToolChoice,
    ToolResult, DEFAULT_SESSION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_STEPS: usize = 8;
const DEFAULT_HISTORY_LIMIT: usize = 20;
const LOG_PREVIEW_CHARS: usize = 500;

const TOOL_CALL_OPEN_TAG: &str = "<tool_call>";
const TOOL_CALL_CLOSE_TAG: &str = "</tool_call>";

/// How tool invocations and their results are written back into the
/// conversation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolTranscript {
    /// One user turn per call: `[TOOL_CALL name] {args}\n[TOOL_RESULT] output`.
    /// Works with endpoints that only partially support the `tool` role.
    #[default]
    Inline,
    /// An assistant turn carrying the calls, then one `tool` turn per result.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The termination tool fired.
    Terminated,
    /// The model answered with bare content and no tool calls.
    DirectAnswer,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub steps: usize,
    pub exit: Exit,
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    max_steps: usize,
    tool_choice: ToolChoice,
    transcript: ToolTranscript,
    text_tool_calls: bool,
    history: Option<Arc<dyn HistoryStore>>,
    history_limit: usize,
    session_id: String,
    compressor: Option<Compressor>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        let context_builder = context_builder.with_tool_specs(tool_registry.schemas());
        Self {
            provider,
            context_builder,
            tool_registry,
            max_steps: DEFAULT_MAX_STEPS,
            tool_choice: ToolChoice::Auto,
            transcript: ToolTranscript::default(),
            text_tool_calls: false,
            history: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            session_id: DEFAULT_SESSION.to_string(),
            compressor: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_transcript(mut self, transcript: ToolTranscript) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn with_text_tool_calls(mut self, enabled: bool) -> Self {
        self.text_tool_calls = enabled;
        self.context_builder = self.context_builder.with_text_tool_protocol(enabled);
        self
    }

    pub fn with_history(
        mut self,
        history: Arc<dyn HistoryStore>,
        session_id: impl Into<String>,
    ) -> Self {
        self.history = Some(history);
        self.session_id = session_id.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_compressor(mut self, compressor: Compressor) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn context_builder(&self) -> &ContextBuilder {
        &self.context_builder
    }

    /// Runs one task end to end: read history, compress, loop, persist.
    pub async fn run(&self, task: &str) -> Result<RunOutcome> {
        let history = self.load_history().await?;
        let mut conversation = self.context_builder.build_conversation(history, task);

        if let Some(compressor) = &self.compressor {
            compressor
                .compress(&mut conversation)
                .await
                .map_err(AgentError::CompletionClient)?;
        }

        let outcome = self.run_conversation(&mut conversation).await?;
        self.persist(task, &outcome.answer).await?;
        Ok(outcome)
    }

    /// Drives the request/execute/append cycle on a prepared conversation.
    pub async fn run_conversation(&self, conversation: &mut Conversation) -> Result<RunOutcome> {
        let tools = self.tool_registry.schemas();

        info!(
            messages = conversation.len(),
            tools = ?self.tool_registry.names(),
            max_steps = self.max_steps,
            "Starting agent loop"
        );
        debug!("Initial context:\n{}", dump(conversation.messages()));
        debug!("Available tools:\n{}", dump(&tools));

        for step in 1..=self.max_steps {
            if conversation.refresh_system(&self.context_builder) {
                info!(
                    step,
                    version = conversation.context_version(),
                    "Applied context update to system turn"
                );
            }

            info!("# Step {}", step);

            let request = ChatRequest::new(conversation.messages())
                .with_tools(&tools)
                .with_tool_choice(self.tool_choice.clone());
            let response = self
                .provider
                .chat(request)
                .await
                .map_err(AgentError::CompletionClient)?;

            let (content, tool_calls) = self.split_response(step, response);

            if !tool_calls.is_empty() {
                if let Some(answer) = self
                    .dispatch(step, conversation, content, tool_calls)
                    .await?
                {
                    info!(step, answer = %answer, "Final answer (terminate)");
                    return Ok(RunOutcome {
                        answer,
                        steps: step,
                        exit: Exit::Terminated,
                    });
                }
                debug!("Step {} messages:\n{}", step, dump(conversation.messages()));
                continue;
            }

            let content = content.trim();
            if !content.is_empty() {
                info!(step, answer = %content, "Final answer (direct content, no tool call)");
                conversation.push(ChatMessage::assistant(content));
                return Ok(RunOutcome {
                    answer: content.to_string(),
                    steps: step,
                    exit: Exit::DirectAnswer,
                });
            }

            warn!(step, "Model returned neither content nor tool calls");
        }

        Err(AgentError::BudgetExhausted {
            max_steps: self.max_steps,
        })
    }

    /// Executes one step's invocations in order. Returns the final answer if
    /// a terminating tool fired.
    async fn dispatch(
        &self,
        step: usize,
        conversation: &mut Conversation,
        content: String,
        tool_calls: Vec<ToolCall>,
    ) -> Result<Option<String>> {
        let tool_calls = dedup_by_name(tool_calls);
        let mut announced = false;

        for call in &tool_calls {
            if self.tool_registry.lookup(&call.name).is_none() {
                return Err(AgentError::UnknownTool {
                    name: call.name.clone(),
                });
            }

            let args = parse_arguments(call)?;
            info!(step, tool = %call.name, arguments = %args, "Calling tool");

            let result = self.tool_registry.execute(&call.name, args.clone()).await?;
            info!(step, tool = %call.name, output = %preview(&result.output), "Tool returned");

            match self.transcript {
                ToolTranscript::Inline => {
                    conversation.push(ChatMessage::user(format!(
                        "[TOOL_CALL {}] {}\n[TOOL_RESULT] {}",
                        call.name, args, result.output
                    )));
                }
                ToolTranscript::Native => {
                    if !announced {
                        conversation.push(ChatMessage::assistant_with_tool_calls(
                            content.clone(),
                            tool_calls.clone(),
                        ));
                        announced = true;
                    }
                    conversation.push(ChatMessage::tool_result(
                        call.id.clone(),
                        result.output.clone(),
                    ));
                }
            }

            let ToolResult {
                terminates,
                output,
                context,
            } = result;

            if let Some(update) = context {
                info!(step, key = %update.key, "Tool requested a context update");
                conversation.record_update(update);
            }

            if terminates {
                return Ok(Some(output));
            }
        }

        Ok(None)
    }

    fn split_response(&self, step: usize, response: ChatResponse) -> (String, Vec<ToolCall>) {
        let (text, calls) = if response.has_tool_calls() || !self.text_tool_calls {
            (response.text.unwrap_or_default(), response.tool_calls)
        } else {
            match &response.text {
                Some(text) => parse_tool_calls_fallback(text),
                None => (String::new(), vec![]),
            }
        };

        let calls = calls
            .into_iter()
            .enumerate()
            .map(|(idx, mut call)| {
                if call.id.is_empty() {
                    call.id = format!("toolcall_{}_{}", step, idx);
                }
                call
            })
            .collect();

        (text, calls)
    }

    async fn load_history(&self) -> Result<Vec<ChatMessage>> {
        let Some(history) = &self.history else {
            return Ok(vec![]);
        };

        let records = history
            .recent(&self.session_id, self.history_limit)
            .await
            .map_err(AgentError::History)?;
        info!(
            session = %self.session_id,
            records = records.len(),
            "Loaded conversation history"
        );
        Ok(records.into_iter().map(ChatMessage::from).collect())
    }

    async fn persist(&self, task: &str, answer: &str) -> Result<()> {
        let Some(history) = &self.history else {
            return Ok(());
        };

        history
            .append(&self.session_id, Role::User, task)
            .await
            .map_err(AgentError::History)?;
        history
            .append(&self.session_id, Role::Assistant, answer)
            .await
            .map_err(AgentError::History)?;

        let total = history
            .count(&self.session_id)
            .await
            .map_err(AgentError::History)?;
        info!(session = %self.session_id, total, "Stored conversation turn");
        Ok(())
    }
}

/// Keeps the first invocation of each tool name within a step. Some
/// upstream APIs repeat the same call; later duplicates are dropped
/// without telling the model.
fn dedup_by_name(tool_calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    tool_calls
        .into_iter()
        .filter(|call| {
            let first = seen.insert(call.name.clone());
            if !first {
                debug!(tool = %call.name, "Dropping duplicate tool call");
            }
            first
        })
        .collect()
}

/// Arguments must be a JSON object; an empty payload means `{}`.
fn parse_arguments(call: &ToolCall) -> Result<serde_json::Value> {
    let raw = if call.arguments.trim().is_empty() {
        "{}"
    } else {
        call.arguments.as_str()
    };

    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)
        .map(serde_json::Value::Object)
        .map_err(|source| AgentError::InvalidToolArguments {
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
            source,
        })
}

fn preview(text: &str) -> String {
    if text.chars().count() > LOG_PREVIEW_CHARS {
        format!("{}...", truncate_chars(text, LOG_PREVIEW_CHARS))
    } else {
        text.to_string()
    }
}

fn dump<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Extracts `<tool_call>{...}</tool_call>` markers from free text. Returns
/// the remaining text and the parsed calls.
fn parse_tool_calls_fallback(response: &str) -> (String, Vec<ToolCall>) {
    let mut text_parts = Vec::new();
    let mut calls = Vec::new();
    let mut remaining = response;

    while let Some(start) = remaining.find(TOOL_CALL_OPEN_TAG) {
        let before = &remaining[..start];
        if !before.trim().is_empty() {
            text_parts.push(before.trim().to_string());
        }

        let after_open = &remaining[start + TOOL_CALL_OPEN_TAG.len()..];
        let Some(close_idx) = after_open.find(TOOL_CALL_CLOSE_TAG) else {
            break;
        };

        for value in extract_json_values(&after_open[..close_idx]) {
            if let Some(call) = parse_tool_call_value(&value) {
                calls.push(call);
            }
        }

        remaining = &after_open[close_idx + TOOL_CALL_CLOSE_TAG.len()..];
    }

    if !remaining.trim().is_empty() {
        text_parts.push(remaining.trim().to_string());
    }

    (text_parts.join("\n"), calls)
}

fn extract_json_values(text: &str) -> Vec<serde_json::Value> {
    let mut values = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start
                        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&text[s..=i])
                    {
                        values.push(value);
                    }
                    start = None;
                }
            }
            _ => {}
        }
    }

    values
}

fn parse_tool_call_value(value: &serde_json::Value) -> Option<ToolCall> {
    let name = value.get("name")?.as_str()?.to_string();
    let arguments = match value.get("arguments") {
        Some(serde_json::Value::String(raw)) => raw.clone(),
        Some(args) => serde_json::to_string(args).ok()?,
        None => "{}".to_string(),
    };
    let digest = md5::compute(format!("{}:{}", name, arguments).as_bytes());

    Some(ToolCall {
        id: format!("call_{:x}", digest),
        name,
        arguments,
    })
}
