//! CLI configuration file support
//!
//! Loads configuration from ~/.config/chatflow/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_RELAY_URL: &str = "http://localhost:3000";

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Relay settings
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Relay connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay base URL
    pub url: Option<String>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chatflow").join("config.toml"))
    }

    /// Resolve the relay URL: CLI flag, then config file, then default.
    pub fn resolve_relay_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.relay.url.clone())
            .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_config() {
        let config = CliConfig {
            relay: RelayConfig {
                url: Some("http://config:3000".to_string()),
            },
        };
        assert_eq!(
            config.resolve_relay_url(Some("http://flag:3000".to_string())),
            "http://flag:3000"
        );
        assert_eq!(config.resolve_relay_url(None), "http://config:3000");
    }

    #[test]
    fn defaults_without_config() {
        let config = CliConfig::default();
        assert_eq!(config.resolve_relay_url(None), DEFAULT_RELAY_URL);
    }
}
