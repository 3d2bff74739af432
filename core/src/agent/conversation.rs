use crate::agent::ContextBuilder;
use crate::traits::{ChatMessage, ContextUpdate, Role};
use std::ops::Range;

/// Conversation state owned by a single run.
///
/// Turn 0 is always the system turn. Other turns are append-only, except
/// for compression which swaps a contiguous range after turn 0 for a
/// summary. Context updates are recorded here and only applied to the
/// system turn when the loop calls [`Conversation::refresh_system`].
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    sections: Vec<ContextUpdate>,
    context_version: u64,
    applied_version: u64,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            sections: Vec::new(),
            context_version: 0,
            applied_version: 0,
        }
    }

    pub fn with_turns(mut self, turns: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(turns);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system(&self) -> &ChatMessage {
        &self.messages[0]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Index of the most recent user turn, if any besides turn 0.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .filter(|idx| *idx > 0)
    }

    /// Swaps `range` for a single turn. Ranges touching turn 0 are ignored.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: ChatMessage) -> bool {
        if range.start == 0 || range.end > self.messages.len() || range.start >= range.end {
            return false;
        }
        self.messages.splice(range, std::iter::once(replacement));
        true
    }

    /// Records an update; the same key overwrites its earlier body.
    pub fn record_update(&mut self, update: ContextUpdate) {
        match self.sections.iter_mut().find(|s| s.key == update.key) {
            Some(existing) => existing.body = update.body,
            None => self.sections.push(update),
        }
        self.context_version += 1;
    }

    pub fn sections(&self) -> &[ContextUpdate] {
        &self.sections
    }

    pub fn context_version(&self) -> u64 {
        self.context_version
    }

    pub fn needs_refresh(&self) -> bool {
        self.context_version != self.applied_version
    }

    /// Rebuilds turn 0 from `builder` when updates are pending.
    pub fn refresh_system(&mut self, builder: &ContextBuilder) -> bool {
        if !self.needs_refresh() {
            return false;
        }
        self.messages[0] = ChatMessage::system(builder.build_system_prompt(&self.sections));
        self.applied_version = self.context_version;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_turn_is_first() {
        let conversation = Conversation::new("sys").with_turns([ChatMessage::user("hi")]);
        assert_eq!(conversation.system().role, Role::System);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last_user_index(), Some(1));
    }

    #[test]
    fn replace_range_never_touches_system() {
        let mut conversation = Conversation::new("sys").with_turns([
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
        ]);
        assert!(!conversation.replace_range(0..2, ChatMessage::system("x")));
        assert!(conversation.replace_range(1..3, ChatMessage::system("summary")));
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.system().content, "sys");
    }

    #[test]
    fn updates_are_versioned_and_applied_explicitly() {
        let builder = ContextBuilder::new("base");
        let mut conversation = Conversation::new(builder.build_system_prompt(&[]));

        conversation.record_update(ContextUpdate {
            key: "pdf".into(),
            body: "v1".into(),
        });
        conversation.record_update(ContextUpdate {
            key: "pdf".into(),
            body: "v2".into(),
        });
        assert_eq!(conversation.context_version(), 2);
        assert_eq!(conversation.sections().len(), 1);
        assert!(!conversation.system().content.contains("v2"));

        assert!(conversation.refresh_system(&builder));
        assert!(conversation.system().content.contains("v2"));
        assert!(!conversation.system().content.contains("v1"));
        assert!(!conversation.refresh_system(&builder));
    }
}
