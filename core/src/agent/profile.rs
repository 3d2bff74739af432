use crate::agent::{AgentLoop, Compressor, ContextBuilder, ToolRegistry};
use crate::config::Config;
use crate::skills::{Skill, SkillRegistry};
use crate::tools::{
    CalculatorTool, DateTimeTool, SearchTool, SkillTool, TerminateTool, WebFetchTool,
    load_mcp_tools,
};
use crate::traits::{HistoryStore, Provider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Preset tool sets and prompts, from the bare loop up to history-aware runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Only `terminate`.
    Minimal,
    /// `terminate`, `datetime`, `calculator`, `search`.
    #[default]
    Tools,
    /// `search`, `terminate` and tools discovered from MCP servers.
    Mcp,
    /// `terminate`, `skill`, `webfetch` and MCP tools.
    Skills,
    /// `terminate` and `search`, with persisted history and compression.
    Context,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Minimal,
        Profile::Tools,
        Profile::Mcp,
        Profile::Skills,
        Profile::Context,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Minimal => "minimal",
            Profile::Tools => "tools",
            Profile::Mcp => "mcp",
            Profile::Skills => "skills",
            Profile::Context => "context",
        }
    }

    pub fn default_max_steps(&self) -> usize {
        match self {
            Profile::Minimal | Profile::Tools | Profile::Mcp => 8,
            Profile::Skills | Profile::Context => 10,
        }
    }

    pub fn uses_history(&self) -> bool {
        matches!(self, Profile::Context)
    }

    fn preamble(&self) -> &'static str {
        match self {
            Profile::Minimal => {
                "You are a minimal agent. You have exactly one tool: `terminate(final: string)`."
            }
            Profile::Tools => "You are a helpful AI Agent.",
            Profile::Mcp => {
                "You are a helpful AI Agent with access to MCP tools.\nMCP (Model Context Protocol) lets you call external services."
            }
            Profile::Skills => {
                "You are MiniManus, an AI Agent with access to Skills and MCP tools.\nSkills let you load domain-specific expertise.\n\nSkills Management:\n- Use the `skill` tool to list, load, or create skills\n- Skills can include instructions, helpers, and even call MCP tools internally"
            }
            Profile::Context => {
                "You are MiniManus, an AI Agent with conversation history.\nThe conversation history is stored in SQLite."
            }
        }
    }

    fn rules(&self) -> &'static [&'static str] {
        match self {
            Profile::Minimal => &[
                "You MUST call `terminate` to return the final answer. Do NOT put the final answer in normal content.",
                "Keep the final answer concise and directly useful.",
            ],
            Profile::Tools => &[
                "Use tools to gather information when needed.",
                "IMPORTANT: After you call a tool, the result will be shown to you. Use that result to form your final answer.",
                "Once you have the result from a tool, call `terminate` immediately with the final answer. Do NOT call the same tool again.",
                "Be concise.",
            ],
            Profile::Mcp => &[
                "Use appropriate tools to look up information when needed.",
                "After getting tool results, analyze and form your answer.",
                "When you have the final answer, call `terminate`.",
            ],
            Profile::Skills => &[
                "Use appropriate tools to accomplish the task.",
                "Use skills to extend your capabilities when needed.",
                "When you have the final answer, call `terminate`.",
            ],
            Profile::Context => &["When you have the final answer, call `terminate`."],
        }
    }

    pub fn context_builder(&self, skills: Vec<Skill>) -> ContextBuilder {
        ContextBuilder::new(self.preamble())
            .with_rules(self.rules().iter().copied())
            .with_skills(skills)
            .with_tool_listing(*self != Profile::Minimal)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown profile: {}. Available: minimal, tools, mcp, skills, context",
                    s
                )
            })
    }
}

pub async fn build_registry(profile: Profile, config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let search = || Arc::new(SearchTool::new(config.tavily_api_key.clone()));

    match profile {
        Profile::Minimal => {
            registry.register(Arc::new(TerminateTool));
        }
        Profile::Tools => {
            registry.register(Arc::new(TerminateTool));
            registry.register(Arc::new(DateTimeTool));
            registry.register(Arc::new(CalculatorTool));
            registry.register(search());
        }
        Profile::Mcp => {
            registry.register(search());
            registry.register(Arc::new(TerminateTool));
            registry.extend(load_mcp_tools(&config.mcp_servers_path()).await);
        }
        Profile::Skills => {
            registry.register(Arc::new(TerminateTool));
            registry.register(Arc::new(SkillTool::new(config.skills_dir())));
            registry.register(Arc::new(WebFetchTool::new()));
            registry.extend(load_mcp_tools(&config.mcp_servers_path()).await);
        }
        Profile::Context => {
            registry.register(Arc::new(TerminateTool));
            registry.register(search());
        }
    }

    registry
}

fn installed_skills(profile: Profile, config: &Config) -> Vec<Skill> {
    if profile != Profile::Skills {
        return vec![];
    }
    match SkillRegistry::discover(&config.skills_dir()) {
        Ok(registry) => registry.list(),
        Err(e) => {
            warn!("Failed to discover skills: {}", e);
            vec![]
        }
    }
}

/// Wires a ready-to-run loop for `profile` from the loaded configuration.
/// `history` is only consulted by profiles that persist conversations.
pub async fn build_agent(
    profile: Profile,
    config: &Config,
    provider: Arc<dyn Provider>,
    history: Option<(Arc<dyn HistoryStore>, String)>,
) -> AgentLoop {
    let registry = Arc::new(build_registry(profile, config).await);
    let context = profile.context_builder(installed_skills(profile, config));

    let mut agent = AgentLoop::new(provider.clone(), context, registry)
        .with_max_steps(config.max_steps.unwrap_or(profile.default_max_steps()))
        .with_transcript(config.tool_transcript)
        .with_text_tool_calls(config.text_tool_calls);

    if profile.uses_history() {
        if let Some((store, session_id)) = history {
            agent = agent
                .with_history(store, session_id)
                .with_history_limit(config.context.history_limit);
        }
        agent = agent.with_compressor(
            Compressor::new(provider).with_max_tokens(config.context.max_tokens),
        );
    }

    agent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistoryStore;
    use crate::providers::scripted::ScriptedProvider;
    use crate::traits::{ChatResponse, Role, ToolCall};
    use tempfile::TempDir;

    fn isolated_config(tmp: &TempDir) -> Config {
        Config {
            skills_dir: Some(tmp.path().join("skills")),
            mcp_servers_path: Some(tmp.path().join("mcp_servers.json")),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn registries_per_profile() {
        let tmp = TempDir::new().unwrap();
        let config = isolated_config(&tmp);

        let names = |r: ToolRegistry| r.names().into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(names(build_registry(Profile::Minimal, &config).await), vec!["terminate"]);
        assert_eq!(
            names(build_registry(Profile::Tools, &config).await),
            vec!["terminate", "datetime", "calculator", "search"]
        );
        assert_eq!(names(build_registry(Profile::Mcp, &config).await), vec!["search", "terminate"]);
        assert_eq!(
            names(build_registry(Profile::Skills, &config).await),
            vec!["terminate", "skill", "webfetch"]
        );
        assert_eq!(
            names(build_registry(Profile::Context, &config).await),
            vec!["terminate", "search"]
        );
    }

    #[test]
    fn parses_profile_names() {
        assert_eq!("Skills".parse::<Profile>().unwrap(), Profile::Skills);
        assert!("lesson5".parse::<Profile>().is_err());
        assert_eq!(Profile::Context.to_string(), "context");
    }

    #[test]
    fn minimal_prompt_has_no_tool_listing() {
        let prompt = Profile::Minimal.context_builder(vec![]).build_system_prompt(&[]);
        assert!(prompt.starts_with("You are a minimal agent."));
        assert!(prompt.contains("1) You MUST call `terminate`"));
        assert!(!prompt.contains("You have access to these tools"));
    }

    #[tokio::test]
    async fn skills_profile_advertises_installed_skills() {
        let tmp = TempDir::new().unwrap();
        let config = isolated_config(&tmp);
        crate::skills::create_skill(&config.skills_dir(), "haiku", "Answer in haiku.").unwrap();

        let provider = Arc::new(ScriptedProvider::new([Ok(ChatResponse::text("done"))]));
        let agent = build_agent(Profile::Skills, &config, provider.clone(), None).await;
        assert_eq!(agent.max_steps(), 10);

        agent.run("hi").await.unwrap();
        let system = &provider.requests()[0].messages[0].content;
        assert!(system.contains("<name>haiku</name>"));
        assert!(system.contains("- `skill` - "));
    }

    #[tokio::test]
    async fn context_profile_persists_history() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            max_steps: Some(3),
            ..isolated_config(&tmp)
        };
        let store = Arc::new(InMemoryHistoryStore::new());

        let provider = Arc::new(ScriptedProvider::new([Ok(ChatResponse::with_tool_calls(
            vec![ToolCall::new("c1", "terminate", r#"{"final": "noted"}"#)],
        ))]));
        let agent = build_agent(
            Profile::Context,
            &config,
            provider,
            Some((store.clone() as Arc<dyn HistoryStore>, "s1".to_string())),
        )
        .await;
        assert_eq!(agent.max_steps(), 3);

        agent.run("remember this").await.unwrap();
        let records = store.recent("s1", 10).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, Role::User);
        assert_eq!(records[1].content, "noted");
    }
}
