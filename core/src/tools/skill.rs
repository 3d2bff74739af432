use crate::skills::{SkillRegistry, create_skill, is_unsafe_skill_name, load_skill};
use crate::tools::extract_string_arg_opt;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::info;

/// Lists, loads and creates skills under a directory. Loading a skill
/// pushes its instructions into the system turn for the following steps.
pub struct SkillTool {
    skills_dir: PathBuf,
}

impl SkillTool {
    pub fn new(skills_dir: impl Into<PathBuf>) -> Self {
        Self {
            skills_dir: skills_dir.into(),
        }
    }

    fn list(&self) -> anyhow::Result<ToolResult> {
        let registry = SkillRegistry::discover(&self.skills_dir)?;
        if registry.count() == 0 {
            return Ok(ToolResult::output(
                "No skills installed. Use the 'create' action to add skills.",
            ));
        }

        let lines: Vec<String> = registry
            .list()
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect();
        Ok(ToolResult::output(format!(
            "Installed skills:\n{}",
            lines.join("\n")
        )))
    }

    fn load(&self, skill_name: &str) -> anyhow::Result<ToolResult> {
        if skill_name.is_empty() {
            return Ok(ToolResult::error("skill_name is required for load"));
        }
        if is_unsafe_skill_name(skill_name) {
            return Ok(ToolResult::error(format!("Invalid skill name: {}", skill_name)));
        }

        let skill_dir = self.skills_dir.join(skill_name);
        if !skill_dir.exists() {
            return Ok(ToolResult::output(format!("Skill '{}' not found.", skill_name)));
        }

        let skill = load_skill(&skill_dir)?;
        info!(skill = %skill.name, "Loaded skill");

        Ok(ToolResult::output(format!(
            "Skill '{}' loaded!\n\nInstructions:\n{}",
            skill_name, skill.body
        ))
        .with_context(skill.name, skill.body))
    }

    fn create(&self, skill_name: &str, content: &str) -> anyhow::Result<ToolResult> {
        if skill_name.is_empty() || content.trim().is_empty() {
            return Ok(ToolResult::error(
                "skill_name and skill_content are required for create",
            ));
        }

        let dir = create_skill(&self.skills_dir, skill_name, content)?;
        Ok(ToolResult::output(format!(
            "Skill '{}' created at {}",
            skill_name,
            dir.display()
        )))
    }
}

#[async_trait]
impl Tool for SkillTool {
    fn name(&self) -> &str {
        "skill"
    }

    fn description(&self) -> &str {
        "Manage skills: list installed skills, load a skill's instructions, or create a new skill."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "Action: list, load, create",
                    "enum": ["list", "load", "create"]
                },
                "skill_name": {
                    "type": "string",
                    "description": "Name of skill to load or create"
                },
                "skill_content": {
                    "type": "string",
                    "description": "Skill content (markdown) for create"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let action = extract_string_arg_opt(&args, "action", "");
        let skill_name = extract_string_arg_opt(&args, "skill_name", "");

        match action.as_str() {
            "list" => self.list(),
            "load" => self.load(skill_name.trim()),
            "create" => {
                let content = extract_string_arg_opt(&args, "skill_content", "");
                self.create(skill_name.trim(), &content)
            }
            other => Ok(ToolResult::output(format!("Unknown action: {}", other))),
        }
    }
}
