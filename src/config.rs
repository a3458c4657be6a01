//! Layered configuration for the Themis service
//!
//! Settings resolve defaults first, then an optional `themis.toml`, then
//! `THEMIS_*` environment variables (double underscore between section and
//! key, e.g. `THEMIS_SERVER__PORT=8080`). The completion API key is the one
//! setting that never lives in a file: it comes from `GROQ_API_KEY`.

use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, ThemisError};

/// Completion endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Max tokens for responses
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: f32,

    /// Hard ceiling on one request, in seconds
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-70b-8192".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

/// Evaluation log settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the CSV log file
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chat_summary_log.csv"),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemisConfig {
    pub completion: CompletionSettings,
    pub store: StoreSettings,
    pub server: ServerSettings,
}

impl ThemisConfig {
    /// Load configuration from the layered sources.
    ///
    /// When `file` is given it must exist; otherwise `themis.toml` is looked
    /// up under the user config directory (XDG standard), then in the working
    /// directory, with the more local file winning.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => {
                if let Some(config_dir) = dirs::config_dir() {
                    builder = builder.add_source(
                        File::from(config_dir.join("themis").join("themis.toml"))
                            .required(false),
                    );
                }
                builder.add_source(File::with_name("themis").required(false))
            }
        };

        let settings = builder
            .add_source(Environment::with_prefix("THEMIS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Resolve the completion API key from `GROQ_API_KEY`.
    pub fn api_key(&self) -> Result<String> {
        match env::var("GROQ_API_KEY") {
            Ok(key) if !key.is_empty() => {
                debug!("Using API key from GROQ_API_KEY environment variable");
                Ok(key)
            }
            _ => Err(ThemisError::Config(config::ConfigError::Message(
                "GROQ_API_KEY not set. Export it in the service environment".to_string(),
            ))),
        }
    }

    /// The HTTP bind address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                ThemisError::Config(config::ConfigError::Message(format!(
                    "Invalid bind address {}:{}: {}",
                    self.server.host, self.server.port, e
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults() {
        env::remove_var("THEMIS_COMPLETION__MODEL");
        env::remove_var("THEMIS_SERVER__PORT");

        let config = ThemisConfig::load(None).unwrap();
        assert_eq!(config.completion.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.completion.model, "llama3-70b-8192");
        assert_eq!(config.completion.timeout_secs, 60);
        assert_eq!(config.store.path, PathBuf::from("chat_summary_log.csv"));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        env::set_var("THEMIS_COMPLETION__MODEL", "llama3-8b-8192");
        env::set_var("THEMIS_SERVER__PORT", "8080");

        let config = ThemisConfig::load(None).unwrap();
        assert_eq!(config.completion.model, "llama3-8b-8192");
        assert_eq!(config.server.port, 8080);

        env::remove_var("THEMIS_COMPLETION__MODEL");
        env::remove_var("THEMIS_SERVER__PORT");
    }

    #[test]
    #[serial]
    fn test_api_key_from_environment() {
        env::set_var("GROQ_API_KEY", "gsk-test-key");
        let config = ThemisConfig::default();
        assert_eq!(config.api_key().unwrap(), "gsk-test-key");
        env::remove_var("GROQ_API_KEY");
    }

    #[test]
    #[serial]
    fn test_missing_api_key_is_config_error() {
        env::remove_var("GROQ_API_KEY");
        let config = ThemisConfig::default();
        assert!(matches!(
            config.api_key(),
            Err(ThemisError::Config(_))
        ));
    }

    #[test]
    fn test_bind_addr() {
        let config = ThemisConfig::default();
        assert_eq!(
            config.bind_addr().unwrap(),
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap()
        );
    }
}
