use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Openrouter,
    Ollama,
    Openai,
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Openrouter => write!(f, "openrouter"),
            LlmProvider::Ollama => write!(f, "ollama"),
            LlmProvider::Openai => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            base_url: String::new(),
            api_key: String::new(),
        }
    }
}

impl LlmConfig {
    /// Returns the effective base_url: if the stored value is empty,
    /// fall back to the canonical URL for the configured provider.
    pub fn effective_base_url(&self) -> &str {
        if !self.base_url.is_empty() {
            return self.base_url.trim_end_matches('/');
        }
        match self.provider {
            LlmProvider::Openrouter => "https://openrouter.ai/api/v1",
            LlmProvider::Ollama => "http://localhost:11434/v1",
            LlmProvider::Openai => "https://api.openai.com/v1",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    /// The only channel the bot listens and replies in. 0 disables every channel.
    #[serde(default)]
    pub allowed_channel_id: u64,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_channel_id: 0,
            command_prefix: default_command_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

impl Config {
    /// Load the TOML file at `path` (if any), then apply environment overrides.
    ///
    /// `required` controls whether a missing file is an error; the implicit
    /// `config.toml` lookup is optional, an explicit path is not.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = if path.exists() || required {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override file values with `DISCORD_TOKEN`, `OPENROUTER_KEY` and
    /// `ALLOWED_CHANNEL_ID` as returned by `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.bot_token = token;
        }
        if let Some(key) = lookup("OPENROUTER_KEY") {
            self.llm.api_key = key;
        }
        if let Some(raw) = lookup("ALLOWED_CHANNEL_ID") {
            self.discord.allowed_channel_id = raw
                .trim()
                .parse()
                .with_context(|| format!("ALLOWED_CHANNEL_ID is not a channel id: {:?}", raw))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            anyhow::bail!("Discord bot token is not set (DISCORD_TOKEN or [discord] bot_token)");
        }
        if self.discord.command_prefix.is_empty() {
            anyhow::bail!("[discord] command_prefix must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.discord.allowed_channel_id, 0);
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.llm.model, "openai/gpt-4o-mini");
        assert_eq!(config.llm.provider, LlmProvider::Openrouter);
        assert_eq!(
            config.llm.effective_base_url(),
            "https://openrouter.ai/api/v1"
        );
    }

    #[test]
    fn test_file_values() {
        let config = Config::from_toml_str(
            r#"
            [discord]
            bot_token = "file-token"
            allowed_channel_id = 555
            command_prefix = "?"

            [llm]
            provider = "ollama"
            model = "llama3"
            "#,
        )
        .unwrap();
        assert_eq!(config.discord.bot_token, "file-token");
        assert_eq!(config.discord.allowed_channel_id, 555);
        assert_eq!(config.discord.command_prefix, "?");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.effective_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = Config::from_toml_str(
            r#"
            [llm]
            provider = "openai"
            base_url = "http://127.0.0.1:9000/v1/"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.effective_base_url(), "http://127.0.0.1:9000/v1");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml_str(
            r#"
            [discord]
            bot_token = "file-token"
            allowed_channel_id = 1
            "#,
        )
        .unwrap();
        config
            .apply_env_with(env(&[
                ("DISCORD_TOKEN", "env-token"),
                ("OPENROUTER_KEY", "sk-or-test"),
                ("ALLOWED_CHANNEL_ID", "555"),
            ]))
            .unwrap();
        assert_eq!(config.discord.bot_token, "env-token");
        assert_eq!(config.llm.api_key, "sk-or-test");
        assert_eq!(config.discord.allowed_channel_id, 555);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_channel_id_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(env(&[("ALLOWED_CHANNEL_ID", "general")]))
            .unwrap_err();
        assert!(err.to_string().contains("ALLOWED_CHANNEL_ID"));
    }

    #[test]
    fn test_missing_token_fails_validation() {
        let mut config = Config::default();
        config.apply_env_with(env(&[])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_required_file_is_error() {
        let path = std::env::temp_dir().join("relaybot-does-not-exist.toml");
        let err = Config::load(&path, true).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
