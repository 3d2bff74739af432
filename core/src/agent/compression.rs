use crate::agent::Conversation;
use crate::traits::{ChatMessage, ChatRequest, Provider, Role};
use anyhow::Result;
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_MAX_TOKENS: usize = 4000;
const CHARS_PER_TOKEN: usize = 4;
const EXCERPT_MAX_CHARS: usize = 200;
const MIN_COMPRESSIBLE_TURNS: usize = 4;
const SUMMARY_PREFIX: &str = "[Conversation summary]";

/// Rough token estimate: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

pub fn estimate_messages(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

/// Replaces everything between the system turn and the latest user turn
/// with a single summary turn produced by one extra completion call.
///
/// Only the retained history (turns after the system turn and before the
/// latest user turn) counts towards the threshold. The summary is not
/// re-measured and compression never chains.
pub struct Compressor {
    provider: Arc<dyn Provider>,
    max_tokens: usize,
}

impl Compressor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Index of the latest user turn when compression is applicable at all.
    fn compressible_until(conversation: &Conversation) -> Option<usize> {
        if conversation.len() < MIN_COMPRESSIBLE_TURNS {
            return None;
        }

        let last_user = conversation.last_user_index()?;
        let has_prior_user = conversation.messages()[1..last_user]
            .iter()
            .any(|m| m.role == Role::User);

        has_prior_user.then_some(last_user)
    }

    pub fn history_tokens(conversation: &Conversation) -> usize {
        let end = conversation
            .last_user_index()
            .unwrap_or(conversation.len());
        estimate_messages(&conversation.messages()[1..end])
    }

    pub fn should_compress(&self, conversation: &Conversation) -> bool {
        Self::history_tokens(conversation) > self.max_tokens
    }

    /// Returns `true` when the conversation was rewritten.
    pub async fn compress(&self, conversation: &mut Conversation) -> Result<bool> {
        let total_tokens = Self::history_tokens(conversation);
        if total_tokens <= self.max_tokens {
            info!(
                tokens = total_tokens,
                threshold = self.max_tokens,
                "History within budget, no compression"
            );
            return Ok(false);
        }

        let Some(last_user) = Self::compressible_until(conversation) else {
            return Ok(false);
        };

        let latest = conversation.messages()[last_user].clone();
        let to_compress = &conversation.messages()[1..last_user];
        info!(
            messages = to_compress.len(),
            tokens = total_tokens,
            threshold = self.max_tokens,
            "Compressing conversation history"
        );

        let transcript = Self::build_transcript(to_compress);
        let summary = self.summarize(&transcript).await?;
        info!(summary = %truncate_chars(&summary, 100), "Received history summary");

        let len = conversation.len();
        let summary_turn = ChatMessage::system(format!("{} {}", SUMMARY_PREFIX, summary.trim()));
        conversation.replace_range(1..len, summary_turn);
        conversation.push(latest);

        info!(
            before = total_tokens,
            after = Self::history_tokens(conversation),
            "Compression finished"
        );
        Ok(true)
    }

    fn build_transcript(messages: &[ChatMessage]) -> String {
        let mut transcript = String::new();
        for msg in messages {
            let _ = writeln!(
                transcript,
                "{}: {}",
                msg.role,
                truncate_chars(&msg.content, EXCERPT_MAX_CHARS)
            );
        }
        transcript.trim_end().to_string()
    }

    async fn summarize(&self, transcript: &str) -> Result<String> {
        let prompt = format!(
            "Summarize the key points of the following conversation in one sentence (50 words at most):\n\n{}\n\nReply with the summary only.",
            transcript
        );
        let messages = [ChatMessage::user(prompt)];

        let response = self.provider.chat(ChatRequest::new(&messages)).await?;
        Ok(response.text.unwrap_or_default())
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedProvider;
    use crate::traits::ChatResponse;

    fn long(text: &str) -> String {
        text.repeat(400)
    }

    #[test]
    fn estimate_is_chars_over_four() {
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abc"), 0);
    }

    #[tokio::test]
    async fn five_turns_become_three() {
        let provider = Arc::new(ScriptedProvider::new([Ok(ChatResponse::text(
            "User asked about rust twice.",
        ))]));
        let compressor = Compressor::new(provider.clone()).with_max_tokens(100);

        let mut conversation = Conversation::new("sys").with_turns([
            ChatMessage::user(long("first question ")),
            ChatMessage::assistant(long("first answer ")),
            ChatMessage::user(long("second question ")),
            ChatMessage::user("latest"),
        ]);

        assert!(compressor.compress(&mut conversation).await.unwrap());

        let messages = conversation.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[1].content,
            "[Conversation summary] User asked about rust twice."
        );
        assert_eq!(messages[2].content, "latest");
        assert_eq!(provider.call_count(), 1);

        let request = &provider.requests()[0];
        assert_eq!(request.messages.len(), 1);
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn two_turns_are_left_alone() {
        let provider = Arc::new(ScriptedProvider::new([]));
        let compressor = Compressor::new(provider.clone()).with_max_tokens(0);

        let mut conversation = Conversation::new(long("sys ")).with_turns([ChatMessage::user(long("q "))]);
        assert!(!compressor.compress(&mut conversation).await.unwrap());
        assert_eq!(conversation.len(), 2);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn no_prior_user_turn_is_a_no_op() {
        let provider = Arc::new(ScriptedProvider::new([]));
        let compressor = Compressor::new(provider.clone()).with_max_tokens(1);

        let mut conversation = Conversation::new("sys").with_turns([
            ChatMessage::assistant(long("a ")),
            ChatMessage::assistant(long("b ")),
            ChatMessage::user("latest"),
        ]);
        assert!(!compressor.compress(&mut conversation).await.unwrap());
        assert_eq!(conversation.len(), 4);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn under_threshold_skips_summary_call() {
        let provider = Arc::new(ScriptedProvider::new([]));
        let compressor = Compressor::new(provider.clone());

        let mut conversation = Conversation::new("sys").with_turns([
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
            ChatMessage::user("c"),
            ChatMessage::user("d"),
        ]);
        assert!(!compressor.should_compress(&conversation));
        assert!(!compressor.compress(&mut conversation).await.unwrap());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn summary_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::new([Err(anyhow::anyhow!("503"))]));
        let compressor = Compressor::new(provider).with_max_tokens(1);

        let mut conversation = Conversation::new("sys").with_turns([
            ChatMessage::user(long("a ")),
            ChatMessage::assistant(long("b ")),
            ChatMessage::user("latest"),
        ]);
        assert!(compressor.compress(&mut conversation).await.is_err());
        assert_eq!(conversation.len(), 4);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
