//! Configuration management for Mitra
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MitraError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Mitra
///
/// This structure holds all configuration needed for the client,
/// including the gateway endpoint, chat behavior, and storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gateway endpoint configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Gateway endpoint configuration
///
/// Specifies where the remote inference backend lives and how long to
/// wait for it. The base URL is overridable so tests can point the
/// client at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the gateway (e.g. `http://localhost:5000`)
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Request timeout in seconds
    ///
    /// Timeout policy lives here, not in the engine: the engine itself
    /// enforces no deadlines on a turn.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_seconds: u64,
}

fn default_gateway_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_gateway_timeout() -> u64 {
    120
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_seconds: default_gateway_timeout(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum outgoing message length in characters
    ///
    /// Messages longer than this are rejected before any network call.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_max_message_length() -> usize {
    4000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Optional database path override
    ///
    /// When unset, the platform data directory is used.
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MitraError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MitraError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("MITRA_GATEWAY_URL") {
            self.gateway.base_url = base_url;
        }

        if let Ok(db_path) = std::env::var("MITRA_DB_PATH") {
            self.storage.path = Some(db_path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(gateway) = &cli.gateway {
            self.gateway.base_url = gateway.clone();
        }

        if let Some(storage_path) = &cli.storage_path {
            self.storage.path = Some(storage_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Returns
    ///
    /// Returns Ok(()) if the configuration is valid
    ///
    /// # Errors
    ///
    /// Returns `MitraError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.gateway.base_url.is_empty() {
            return Err(MitraError::Config("gateway.base_url cannot be empty".to_string()).into());
        }

        if url::Url::parse(&self.gateway.base_url).is_err() {
            return Err(MitraError::Config(format!(
                "gateway.base_url is not a valid URL: {}",
                self.gateway.base_url
            ))
            .into());
        }

        if self.gateway.timeout_seconds == 0 {
            return Err(MitraError::Config(
                "gateway.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.max_message_length == 0 {
            return Err(MitraError::Config(
                "chat.max_message_length must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_no_overrides() -> crate::cli::Cli {
        use clap::Parser;
        crate::cli::Cli::parse_from(["mitra", "health"])
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.gateway.base_url, "http://localhost:5000");
        assert_eq!(config.gateway.timeout_seconds, 120);
        assert_eq!(config.chat.max_message_length, 4000);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn test_parse_partial_yaml_uses_defaults() {
        let yaml = "gateway:\n  base_url: http://example.com\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.base_url, "http://example.com");
        assert_eq!(config.gateway.timeout_seconds, 120);
        assert_eq!(config.chat.max_message_length, 4000);
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let mut config = Config::default();
        config.gateway.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_invalid_base_url() {
        let mut config = Config::default();
        config.gateway.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.gateway.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_max_message_length() {
        let mut config = Config::default();
        config.chat.max_message_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let cli = cli_with_no_overrides();
        let config = Config::load("/nonexistent/mitra.yaml", &cli).unwrap();
        assert_eq!(config.gateway.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.gateway.base_url, config.gateway.base_url);
        assert_eq!(parsed.chat.max_message_length, config.chat.max_message_length);
    }
}
