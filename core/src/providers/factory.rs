use crate::config::Config;
use crate::providers::OpenAIProvider;
use crate::providers::openai::DEFAULT_BASE_URL;
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::info;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const MOONSHOT_BASE_URL: &str = "https://api.moonshot.cn/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Every supported backend speaks the OpenAI chat-completions dialect; the
/// provider name only picks defaults for the endpoint and key lookup.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    let (base_url, api_key) = match provider_name.to_lowercase().as_str() {
        "openai" => (
            DEFAULT_BASE_URL,
            resolve_api_key_with_fallback(&["OPENAI_API_KEY", "OPENAI_KEY"], &config.api_key)?,
        ),
        "openrouter" => (
            OPENROUTER_BASE_URL,
            resolve_api_key_with_fallback(&["OPENROUTER_API_KEY"], &config.api_key)?,
        ),
        "moonshot" | "kimi" => (
            MOONSHOT_BASE_URL,
            resolve_api_key_with_fallback(&["MOONSHOT_API_KEY"], &config.api_key)?,
        ),
        "ollama" => (
            OLLAMA_BASE_URL,
            if config.api_key.is_empty() {
                "ollama".to_string()
            } else {
                config.api_key.clone()
            },
        ),
        "custom" => {
            if config.base_url.is_none() {
                return Err(anyhow!("Provider 'custom' requires base_url"));
            }
            ("", resolve_api_key_with_fallback(&[], &config.api_key)?)
        }
        _ => {
            return Err(anyhow!(
                "Unknown provider: {}. Available: openai, openrouter, moonshot, ollama, custom",
                provider_name
            ));
        }
    };

    let provider = OpenAIProvider::new(api_key)
        .with_model(config.model.clone())
        .with_base_url(config.base_url.as_deref().unwrap_or(base_url))
        .with_temperature(config.temperature)
        .with_timeout(config.timeout_secs);

    info!(
        provider = provider_name,
        model = provider.model(),
        base_url = provider.base_url(),
        "Created completion client"
    );
    Ok(Arc::new(provider))
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    if !config_key.trim().is_empty() {
        return Ok(config_key.to_string());
    }
    for var_name in env_vars {
        if let Ok(key) = resolve_api_key_from_env(var_name) {
            return Ok(key);
        }
    }
    Err(anyhow!(
        "No API key found. Set OPENAI_API_KEY or run 'minimanus onboard'."
    ))
}

fn resolve_api_key_from_env(var_name: &str) -> Result<String> {
    std::env::var(var_name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("Environment variable {} not set", var_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> Config {
        Config {
            provider: Some(provider.to_string()),
            api_key: "sk-test".into(),
            ..Config::default()
        }
    }

    #[test]
    fn aliases_resolve() {
        for name in ["openai", "OpenRouter", "moonshot", "kimi", "ollama"] {
            let provider = create_provider(&config(name)).unwrap();
            assert_eq!(provider.name(), "openai");
        }
    }

    #[test]
    fn ollama_needs_no_key() {
        let cfg = Config {
            provider: Some("ollama".into()),
            ..Config::default()
        };
        assert!(create_provider(&cfg).is_ok());
    }

    #[test]
    fn custom_requires_base_url() {
        assert!(create_provider(&config("custom")).is_err());

        let cfg = Config {
            base_url: Some("http://localhost:8000/v1".into()),
            ..config("custom")
        };
        assert!(create_provider(&cfg).is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = create_provider(&config("glm")).err().unwrap();
        assert!(err.to_string().contains("Unknown provider: glm"));
    }

    #[test]
    fn config_key_wins_over_env() {
        assert_eq!(
            resolve_api_key_with_fallback(&["MINIMANUS_TEST_UNSET_VAR"], "cfg").unwrap(),
            "cfg"
        );
        assert!(resolve_api_key_with_fallback(&["MINIMANUS_TEST_UNSET_VAR"], "").is_err());
    }
}
