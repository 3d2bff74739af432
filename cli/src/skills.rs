use anyhow::Result;
use console::style;
use minimanus_core::skills::{self, SkillRegistry};
use std::path::{Path, PathBuf};

pub fn handle_command(command: SkillsCommands, skills_dir: &Path) -> Result<()> {
    match command {
        SkillsCommands::List => list_skills(skills_dir),
        SkillsCommands::Create { name, file } => create_skill(&name, &file, skills_dir),
        SkillsCommands::Remove { name } => remove_skill(&name, skills_dir),
    }
}

fn list_skills(skills_dir: &Path) -> Result<()> {
    let registry = SkillRegistry::discover(skills_dir)?;

    if registry.count() == 0 {
        println!("{} No skills installed", style("!").yellow());
        println!();
        println!("Create one:");
        print_create_skill_help(skills_dir);
        return Ok(());
    }

    println!(
        "{} Installed skills ({})",
        style("✓").green().bold(),
        registry.count()
    );
    println!();

    for skill in registry.list() {
        println!(
            "  {} {} - {}",
            style(&skill.name).white().bold(),
            style(format!("v{}", skill.version)).dim(),
            skill.description
        );
    }

    Ok(())
}

fn create_skill(name: &str, file: &Path, skills_dir: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let dir = skills::create_skill(skills_dir, name, &content)?;
    println!(
        "{} Skill '{}' created at {}",
        style("✓").green().bold(),
        name,
        dir.display()
    );
    Ok(())
}

fn remove_skill(name: &str, skills_dir: &Path) -> Result<()> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        anyhow::bail!("Invalid skill name: {}", name);
    }

    let skill_path = skills_dir.join(name);

    let canonical_skills = skills_dir
        .canonicalize()
        .unwrap_or_else(|_| skills_dir.to_path_buf());

    if let Ok(canonical_skill) = skill_path.canonicalize()
        && !canonical_skill.starts_with(&canonical_skills)
    {
        anyhow::bail!("Skill path escapes skills directory: {}", name);
    }

    if !skill_path.exists() {
        anyhow::bail!("Skill not found: {}", name);
    }

    std::fs::remove_dir_all(&skill_path)?;
    println!("{} Skill '{}' removed", style("✓").green().bold(), name);

    Ok(())
}

fn print_create_skill_help(skills_dir: &Path) {
    println!("  minimanus skills create my-skill --file instructions.md");
    println!("or by hand:");
    println!("  mkdir -p {}/my-skill", skills_dir.display());
    println!(
        "  echo '# My Skill' > {}/my-skill/{}",
        skills_dir.display(),
        skills::SKILL_FILE
    );
}

#[derive(clap::Subcommand, Clone, Debug)]
pub enum SkillsCommands {
    List,
    /// Create a skill from a markdown file of instructions
    Create {
        name: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    Remove {
        name: String,
    },
}
