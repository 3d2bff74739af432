use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{Skill, is_unsafe_skill_name, load_skill};

/// Snapshot of the skills installed under one directory, keyed by the
/// directory name.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Skill>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discover(skills_dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        if !skills_dir.exists() {
            tracing::debug!("Skills directory does not exist: {}", skills_dir.display());
            return Ok(registry);
        }

        let entries = fs::read_dir(skills_dir).with_context(|| {
            format!("Failed to read skills directory: {}", skills_dir.display())
        })?;

        let mut skipped = 0;

        for entry in entries {
            let path = entry?.path();

            if !path.is_dir() {
                continue;
            }

            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            if is_unsafe_skill_name(&name) {
                tracing::warn!("Skipping unsafe skill name: {}", name);
                skipped += 1;
                continue;
            }

            match load_skill(&path) {
                Ok(skill) => {
                    registry.skills.insert(name, skill);
                }
                Err(e) => {
                    tracing::debug!("Skipping '{}': {}", name, e);
                    skipped += 1;
                }
            }
        }

        tracing::debug!(
            loaded = registry.count(),
            skipped,
            path = %skills_dir.display(),
            "Skills discovered"
        );

        Ok(registry)
    }

    pub fn list(&self) -> Vec<Skill> {
        self.skills.values().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.skills.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.skills.len()
    }
}
