use crate::templates::{DEFAULT_MCP_SERVERS, EXAMPLE_SKILL, EXAMPLE_SKILL_NAME};
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use minimanus_core::config::{self, Config};
use minimanus_core::skills::SKILL_FILE;
use std::path::Path;

const BANNER: &str = r"
    -------------------------------------

     m i n i m a n u s

     one loop, a few tools, a final answer

    -------------------------------------
";

const PROVIDERS: [(&str, &str); 5] = [
    ("openai", "gpt-4o"),
    ("openrouter", "openai/gpt-4o"),
    ("moonshot", "moonshot-v1-8k"),
    ("ollama", "qwen2.5:7b"),
    ("custom", "gpt-4o"),
];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn ensure_file(path: &Path, content: &str) -> Result<bool> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn setup_provider() -> Result<usize> {
    let names: Vec<&str> = PROVIDERS.iter().map(|(name, _)| *name).collect();

    Select::new()
        .with_prompt("Select your provider")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to select provider")
}

fn setup_api_key(provider: &str) -> Result<String> {
    if provider == "ollama" {
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", provider))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn setup_base_url(provider: &str) -> Result<Option<String>> {
    if provider != "custom" {
        return Ok(None);
    }

    let base_url: String = Input::new()
        .with_prompt("Base URL of the OpenAI-compatible endpoint")
        .interact_text()
        .context("Failed to read base URL")?;

    Ok(Some(base_url.trim().to_string()))
}

fn setup_model(default_model: &str) -> Result<String> {
    Input::new()
        .with_prompt("Model")
        .default(default_model.to_string())
        .interact_text()
        .context("Failed to read model")
}

fn setup_tavily_key() -> Result<Option<String>> {
    let key: String = Input::new()
        .with_prompt("Tavily API key for web search (leave empty to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read Tavily key")?;

    Ok(Some(key.trim().to_string()).filter(|k| !k.is_empty()))
}

fn create_workspace(config: &Config) -> Result<()> {
    let skills_dir = config.skills_dir();
    minimanus_core::skills::init_skills_dir(&skills_dir)?;
    ensure_file(
        &skills_dir.join(EXAMPLE_SKILL_NAME).join(SKILL_FILE),
        EXAMPLE_SKILL,
    )?;
    ensure_file(&config.mcp_servers_path(), DEFAULT_MCP_SERVERS)?;
    Ok(())
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to minimanus!").white().bold());
    println!(
        "  {}",
        style("This wizard writes ~/.minimanus/config.toml.").dim()
    );
    println!();

    print_step(1, 4, "Provider");
    let (provider, default_model) = PROVIDERS[setup_provider()?];

    print_step(2, 4, "Credentials");
    let api_key = setup_api_key(provider)?;
    let base_url = setup_base_url(provider)?;

    print_step(3, 4, "Model and Tools");
    let model = setup_model(default_model)?;
    let tavily_api_key = setup_tavily_key()?;

    let config = Config {
        provider: Some(provider.to_string()),
        api_key,
        base_url,
        model,
        tavily_api_key,
        ..Default::default()
    };

    print_step(4, 4, "Workspace Setup");
    if let Err(e) = create_workspace(&config) {
        eprintln!(
            "  {} Warning: Could not create workspace files: {}",
            style("!").yellow(),
            e
        );
    } else {
        println!(
            "  {} Skills directory ready at {}",
            style("✓").green(),
            style(config.skills_dir().display()).cyan()
        );
        println!(
            "  {} MCP servers listed in {}",
            style("✓").green(),
            style(config.mcp_servers_path().display()).cyan()
        );
    }

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("minimanus run --task \"what is 2**10?\"").cyan().bold()
    );
    println!();

    Ok(config)
}
