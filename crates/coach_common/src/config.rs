//! Client configuration.
//!
//! Config file: ~/.config/coach/config.toml or /etc/coach/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::protocol::{DEFAULT_HOST, DEFAULT_PORT};

/// Inference server endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Completion service endpoint (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Environment variable holding the API credential.
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Speech capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Fixed listening window per utterance, in seconds.
    pub listen_secs: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self { listen_secs: 5.0 }
    }
}

/// Session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name the coach greets the user by.
    pub user_name: String,
    /// Attempt budget for extracting one rating before giving up on the
    /// iteration.
    pub max_rating_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_name: "stranger".to_string(),
            max_rating_attempts: 5,
        }
    }
}

/// Main coach configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl CoachConfig {
    /// Default user config path: ~/.config/coach/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("XDG_CONFIG_HOME"))
            .context("Cannot determine home directory")?;

        let config_dir = if home.contains("/.config") {
            PathBuf::from(home)
        } else {
            Path::new(&home).join(".config")
        };

        Ok(config_dir.join("coach").join("config.toml"))
    }

    /// System config path: /etc/coach/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/coach/config.toml")
    }

    /// Load configuration from file.
    ///
    /// Priority:
    /// 1. User config (~/.config/coach/config.toml)
    /// 2. System config (/etc/coach/config.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: CoachConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the user config file.
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(&path, toml_string)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoachConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 65432);
        assert_eq!(config.session.user_name, "stranger");
        assert_eq!(config.session.max_rating_attempts, 5);
        assert_eq!(config.completion.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut original = CoachConfig::default();
        original.server.host = "inference.local".to_string();
        original.server.port = 9000;
        original.session.user_name = "Ada".to_string();

        let toml = toml::to_string(&original).unwrap();
        let parsed: CoachConfig = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.server.host, "inference.local");
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.session.user_name, "Ada");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: CoachConfig = toml::from_str("[server]\nhost = \"remote\"\n").unwrap();
        assert_eq!(parsed.server.host, "remote");
        assert_eq!(parsed.server.port, 65432);
        assert_eq!(parsed.speech.listen_secs, 5.0);
    }
}
