pub mod manifest;
pub mod registry;

pub use manifest::{SKILL_FILE, Skill, create_skill, load_skill};
pub use registry::SkillRegistry;

use anyhow::Result;
use std::path::Path;

pub fn init_skills_dir(skills_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(skills_dir)?;
    Ok(())
}

pub(crate) fn is_unsafe_skill_name(name: &str) -> bool {
    name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.trim().is_empty()
}
