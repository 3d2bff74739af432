use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SKILL_FILE: &str = "SKILL.md";

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_version")]
    version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Instructions following the front matter.
    pub body: String,
    pub location: Option<PathBuf>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

pub fn load_skill(skill_dir: &Path) -> Result<Skill> {
    let md_path = skill_dir.join(SKILL_FILE);

    if md_path.exists() {
        let dir_name = skill_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed");
        load_skill_md(&md_path, dir_name)
    } else {
        anyhow::bail!("No {} found in {}", SKILL_FILE, skill_dir.display());
    }
}

fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;
    let end = rest.find("\n---")?;
    let front = &rest[..end];
    let body = &rest[end + 4..];
    Some((front, body))
}

fn load_skill_md(path: &Path, dir_name: &str) -> Result<Skill> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let (front, body) = match split_front_matter(&content) {
        Some((front, body)) => {
            let front = serde_yaml::from_str::<FrontMatter>(front).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), "Ignoring malformed front matter: {}", e);
                FrontMatter::default()
            });
            (front, body.trim().to_string())
        }
        None => (FrontMatter::default(), content.trim().to_string()),
    };

    let description = front.description.unwrap_or_else(|| {
        body.lines()
            .find(|l| !(l.starts_with('#') || l.trim().is_empty()))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    });

    Ok(Skill {
        name: front
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| dir_name.to_string()),
        description,
        version: if front.version.is_empty() {
            default_version()
        } else {
            front.version
        },
        body,
        location: Some(path.to_path_buf()),
    })
}

/// Writes `<skills_dir>/<name>/SKILL.md` with a generated front matter.
pub fn create_skill(skills_dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    if super::is_unsafe_skill_name(name) {
        anyhow::bail!("Invalid skill name: {}", name);
    }

    let skill_dir = skills_dir.join(name);
    fs::create_dir_all(&skill_dir)
        .with_context(|| format!("Failed to create {}", skill_dir.display()))?;

    let document = format!(
        "---\nname: {}\ndescription: A custom skill\nversion: 1.0.0\n---\n\n{}\n",
        name,
        content.trim()
    );
    let md_path = skill_dir.join(SKILL_FILE);
    fs::write(&md_path, document)
        .with_context(|| format!("Failed to write {}", md_path.display()))?;

    Ok(skill_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn front_matter_and_body() {
        let tmp = TempDir::new().unwrap();
        let skill_dir = tmp.path().join("pdf");
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join(SKILL_FILE),
            "---\nname: pdf-tools\ndescription: \"Work with PDF files\"\n---\n\n# PDF\nUse pdftotext.\n",
        )
        .unwrap();

        let skill = load_skill(&skill_dir).unwrap();
        assert_eq!(skill.name, "pdf-tools");
        assert_eq!(skill.description, "Work with PDF files");
        assert_eq!(skill.version, "0.1.0");
        assert_eq!(skill.body, "# PDF\nUse pdftotext.");
    }

    #[test]
    fn plain_markdown_falls_back_to_directory_name() {
        let tmp = TempDir::new().unwrap();
        let skill_dir = tmp.path().join("test-skill");
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join(SKILL_FILE),
            "# Test Skill\nThis is a test description.\n",
        )
        .unwrap();

        let skill = load_skill(&skill_dir).unwrap();
        assert_eq!(skill.name, "test-skill");
        assert_eq!(skill.description, "This is a test description.");
        assert_eq!(skill.body, "# Test Skill\nThis is a test description.");
    }

    #[test]
    fn no_skill_file() {
        let tmp = TempDir::new().unwrap();
        let skill_dir = tmp.path().join("empty");
        fs::create_dir_all(&skill_dir).unwrap();

        assert!(load_skill(&skill_dir).is_err());
    }

    #[test]
    fn created_skill_loads_back() {
        let tmp = TempDir::new().unwrap();
        let dir = create_skill(tmp.path(), "haiku", "Answer in haiku form.").unwrap();
        assert_eq!(dir, tmp.path().join("haiku"));

        let skill = load_skill(&dir).unwrap();
        assert_eq!(skill.name, "haiku");
        assert_eq!(skill.description, "A custom skill");
        assert_eq!(skill.version, "1.0.0");
        assert_eq!(skill.body, "Answer in haiku form.");
    }

    #[test]
    fn create_rejects_path_traversal() {
        let tmp = TempDir::new().unwrap();
        assert!(create_skill(tmp.path(), "../escape", "x").is_err());
    }
}
