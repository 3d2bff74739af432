use crate::agent::Conversation;
use crate::skills::Skill;
use crate::traits::{ChatMessage, ContextUpdate, ToolSpec};
use std::fmt::Write;

/// Assembles the system turn from a fixed preamble, the advertised tools,
/// installed skills, and whatever context tools pushed during the run.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    pub preamble: String,
    pub rules: Vec<String>,
    pub tool_specs: Vec<ToolSpec>,
    pub skills: Vec<Skill>,
    pub list_tools: bool,
    pub text_tool_protocol: bool,
}

impl ContextBuilder {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
            list_tools: true,
            ..Self::default()
        }
    }

    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tool_specs(mut self, tool_specs: Vec<ToolSpec>) -> Self {
        self.tool_specs = tool_specs;
        self
    }

    pub fn with_skills(mut self, skills: Vec<Skill>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_tool_listing(mut self, enabled: bool) -> Self {
        self.list_tools = enabled;
        self
    }

    pub fn with_text_tool_protocol(mut self, enabled: bool) -> Self {
        self.text_tool_protocol = enabled;
        self
    }

    pub fn build_system_prompt(&self, sections: &[ContextUpdate]) -> String {
        let mut parts = vec![self.preamble.trim_end().to_string()];

        if let Some(tools) = self.get_tool_list() {
            parts.push(tools);
        }

        if self.text_tool_protocol {
            parts.push(self.get_tool_protocol());
        }

        if let Some(skills) = self.get_skills_context() {
            parts.push(skills);
        }

        if let Some(active) = Self::get_active_context(sections) {
            parts.push(active);
        }

        if let Some(rules) = self.get_rules() {
            parts.push(rules);
        }

        parts.retain(|p| !p.is_empty());
        parts.join("\n\n")
    }

    pub fn build_conversation(&self, history: Vec<ChatMessage>, task: &str) -> Conversation {
        Conversation::new(self.build_system_prompt(&[]))
            .with_turns(history)
            .with_turns([ChatMessage::user(task)])
    }

    fn get_tool_list(&self) -> Option<String> {
        if !self.list_tools || self.tool_specs.is_empty() {
            return None;
        }

        let mut list = String::from("You have access to these tools:\n");
        for tool in &self.tool_specs {
            let _ = writeln!(list, "- `{}` - {}", tool.name, tool.description.trim());
        }
        Some(list.trim_end().to_string())
    }

    fn get_tool_protocol(&self) -> String {
        let mut instructions = String::new();
        instructions.push_str("## Tool Use Protocol\n\n");
        instructions.push_str("If you cannot emit structured function calls, wrap a JSON object in <tool_call> tags:\n\n");
        instructions.push_str("```\n<tool_call>\n{\"name\": \"tool_name\", \"arguments\": {\"param\": \"value\"}}\n</tool_call>\n```\n\n");
        instructions.push_str("Results come back in the next turn. Finish by calling `terminate`.");
        instructions
    }

    fn get_skills_context(&self) -> Option<String> {
        if self.skills.is_empty() {
            return None;
        }

        let mut parts = vec!["## Installed Skills\n\n<available_skills>".to_string()];

        for skill in &self.skills {
            parts.push(format!(
                "  <skill>\n    <name>{}</name>\n    <description>{}</description>\n  </skill>",
                skill.name, skill.description
            ));
        }

        parts.push("</available_skills>".to_string());

        Some(parts.join("\n"))
    }

    fn get_active_context(sections: &[ContextUpdate]) -> Option<String> {
        if sections.is_empty() {
            return None;
        }

        let mut context = String::from("# Active Skill Context");
        for section in sections {
            let _ = write!(context, "\n\n## Skill: {}\n{}", section.key, section.body.trim());
        }
        Some(context)
    }

    fn get_rules(&self) -> Option<String> {
        if self.rules.is_empty() {
            return None;
        }

        let mut rules = String::from("Rules:");
        for (idx, rule) in self.rules.iter().enumerate() {
            let _ = write!(rules, "\n{}) {}", idx + 1, rule);
        }
        Some(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Role;
    use serde_json::json;

    fn spec(name: &str, description: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            description: description.into(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn prompt_lists_tools_and_numbered_rules() {
        let builder = ContextBuilder::new("You are a helpful AI Agent.")
            .with_tool_specs(vec![spec("terminate", "End the loop.")])
            .with_rules(["Be concise.", "Call `terminate` at the end."]);

        let prompt = builder.build_system_prompt(&[]);
        assert!(prompt.starts_with("You are a helpful AI Agent."));
        assert!(prompt.contains("- `terminate` - End the loop."));
        assert!(prompt.contains("1) Be concise.\n2) Call `terminate` at the end."));
        assert!(!prompt.contains("<tool_call>"));
    }

    #[test]
    fn active_sections_are_rendered() {
        let builder = ContextBuilder::new("base");
        let prompt = builder.build_system_prompt(&[ContextUpdate {
            key: "pdf".into(),
            body: "Use pdftotext.".into(),
        }]);
        assert!(prompt.contains("# Active Skill Context\n\n## Skill: pdf\nUse pdftotext."));
    }

    #[test]
    fn conversation_is_system_history_task() {
        let builder = ContextBuilder::new("base");
        let conversation = builder.build_conversation(
            vec![ChatMessage::user("old"), ChatMessage::assistant("reply")],
            "new task",
        );
        let roles: Vec<_> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(conversation.messages()[3].content, "new task");
    }
}
