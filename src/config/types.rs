//! Core configuration types.

use super::defaults::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Identity on every network.
    pub bot: BotConfig,
    /// Networks to connect to.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
    /// Channels joined on servers that do not list their own.
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub nickserv: NickServConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Run the startup checks, folding every problem into one error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        super::validate(self).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ConfigError::Invalid(messages.join("; "))
        })
    }

    /// Autojoin list for `server`.
    pub fn channels_for<'a>(&'a self, server: &'a ServerConfig) -> &'a [String] {
        server.channels.as_deref().unwrap_or(&self.channels)
    }
}

/// Who the bot is.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub nickname: String,
    #[serde(default = "default_ident")]
    pub ident: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// CTCP VERSION reply. No reply when unset.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub quit_message: Option<String>,
    /// Prefix for commands that do not set their own.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// One network.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// `host:port`.
    pub address: String,
    /// Overrides the top-level channel list.
    #[serde(default)]
    pub channels: Option<Vec<String>>,
}

/// Identity service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NickServConfig {
    /// Nick of the identity service.
    #[serde(default = "default_nickserv_nick")]
    pub nick: String,
    /// When set, the bot identifies after welcome and joins once it is +r.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_nickserv_timeout")]
    pub timeout_secs: u64,
}

impl Default for NickServConfig {
    fn default() -> Self {
        Self {
            nick: default_nickserv_nick(),
            password: None,
            timeout_secs: default_nickserv_timeout(),
        }
    }
}

impl NickServConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Account store location.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}
