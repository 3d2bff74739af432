use crate::agent::ToolTranscript;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const MINIMANUS_DIR: &str = ".minimanus";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Estimated-token threshold above which history gets summarized.
    pub max_tokens: usize,
    pub history_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            history_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
    /// Overrides the profile's step budget when set.
    pub max_steps: Option<usize>,
    pub tool_transcript: ToolTranscript,
    pub text_tool_calls: bool,
    pub tavily_api_key: Option<String>,
    pub skills_dir: Option<PathBuf>,
    pub mcp_servers_path: Option<PathBuf>,
    pub history_db: Option<PathBuf>,
    pub context: ContextConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            temperature: 1.0,
            timeout_secs: 60,
            max_steps: None,
            tool_transcript: ToolTranscript::default(),
            text_tool_calls: false,
            tavily_api_key: None,
            skills_dir: None,
            mcp_servers_path: None,
            history_db: None,
            context: ContextConfig::default(),
        }
    }
}

pub fn get_minimanus_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(MINIMANUS_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_minimanus_dir().join("config.toml")
}

pub fn ensure_minimanus_dir() -> Result<PathBuf> {
    let dir = get_minimanus_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).with_context(|| {
            format!("Failed to create minimanus directory at {}", dir.display())
        })?;
    }

    Ok(dir)
}

/// Loads `.env` from the working directory. Variables already present in
/// the process environment are left untouched.
pub fn load_dotenv() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded .env");
            Some(path)
        }
        Err(_) => None,
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let mut config = if config_exists() {
            load_config()?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .find(|v| !v.trim().is_empty())
        };

        if let Some(key) = first(&["OPENAI_KEY", "OPENAI_API_KEY"]) {
            self.api_key = key;
        }
        if let Some(url) = first(&["OPENAI_BASE_URL", "OPENAI_BASE"]) {
            self.base_url = Some(url);
        }
        if let Some(model) = first(&["OPENAI_MODEL"]) {
            self.model = model;
        }
        if let Some(timeout) = first(&["OPENAI_TIMEOUT_S"]).and_then(|t| parse_timeout(&t)) {
            self.timeout_secs = timeout;
        }
        if let Some(key) = first(&["TAVILY_KEY"]) {
            self.tavily_api_key = Some(key);
        }
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.skills_dir
            .clone()
            .unwrap_or_else(|| get_minimanus_dir().join("skills"))
    }

    pub fn mcp_servers_path(&self) -> PathBuf {
        self.mcp_servers_path
            .clone()
            .unwrap_or_else(|| get_minimanus_dir().join("mcp_servers.json"))
    }

    pub fn history_db(&self) -> PathBuf {
        self.history_db
            .clone()
            .unwrap_or_else(|| get_minimanus_dir().join("messages.db"))
    }
}

fn parse_timeout(raw: &str) -> Option<u64> {
    let secs: f64 = raw.trim().parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| secs.ceil() as u64)
}

pub fn load_config() -> Result<Config> {
    let config_path = get_config_path();

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'minimanus onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_minimanus_dir()?;

    let config_path = get_config_path();
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}
