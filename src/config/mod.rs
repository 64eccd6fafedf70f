//! # Configuration Management Module
//!
//! Centralized configuration for a mucbot instance: who the bot is, where it
//! connects, which rooms it joins and who may operate it.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - Identity, rooms, privileged users and command behaviour
//! - [`ServerConfig`] - Optional host/port override for the protocol client
//! - [`LoggingConfig`] - Log level and file sinks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mucbot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("Bot: {}", config.bot.jid);
//!     println!("Server: {}", config.server_address()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bot]
//! jid = "bot@example.com"
//! password = "secret"
//! rooms = ["lobby@conference.example.com"]
//! users = ["owner@example.com"]
//!
//! [server]
//! host = "talk.example.com"
//! port = 5223
//!
//! [logging]
//! level = "info"
//! file = "mucbot.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::identity::{ServerAddress, DEFAULT_PORT, DEFAULT_RESOURCE};
use crate::protocol::Jid;
use crate::validation::{normalize_prefix, split_room_id, validate_resource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot account address (`user@domain`).
    pub jid: String,
    pub password: String,
    /// Session resource label. Generated as `<resource_prefix><random>` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default = "default_resource_prefix")]
    pub resource_prefix: String,
    /// Rooms (`room@server`) joined at startup.
    #[serde(default)]
    pub rooms: Vec<String>,
    /// Master users. The bot requests a subscription from each at startup and
    /// approves their reciprocal request; once subscribed they are privileged.
    #[serde(default)]
    pub users: Vec<String>,
    /// Command prefix. Must be one of a hard-coded allowed set: "!", "^", "+", "$", "/", ">".
    /// If unset or invalid, defaults to "!".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_prefix: Option<String>,
    /// Keep-alive period in seconds (0 disables).
    #[serde(default = "default_idle_interval")]
    pub idle_interval_secs: u64,
    /// Seconds an unanswered room join may stay outstanding before it is abandoned (0 disables).
    #[serde(default = "default_join_timeout")]
    pub join_timeout_secs: u64,
}

fn default_resource_prefix() -> String {
    DEFAULT_RESOURCE.to_string()
}

fn default_idle_interval() -> u64 {
    60
}

fn default_join_timeout() -> u64 {
    120
}

impl BotConfig {
    pub fn effective_command_prefix(&self) -> char {
        normalize_prefix(self.command_prefix.as_deref())
    }

    pub fn idle_interval(&self) -> Option<Duration> {
        (self.idle_interval_secs > 0).then(|| Duration::from_secs(self.idle_interval_secs))
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        (self.join_timeout_secs > 0).then(|| Duration::from_secs(self.join_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Host to connect to instead of the account domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Parsed bot account address.
    pub fn bot_jid(&self) -> Result<Jid> {
        let jid: Jid = self
            .bot
            .jid
            .parse()
            .map_err(|e| anyhow!("Invalid bot jid {}: {}", self.bot.jid, e))?;
        if jid.node().is_none() {
            return Err(anyhow!("Bot jid {} has no user part", self.bot.jid));
        }
        Ok(jid.bare())
    }

    /// Host/port override, or the account domain on the standard port.
    pub fn server_address(&self) -> Result<ServerAddress> {
        let jid = self.bot_jid()?;
        let host = self
            .server
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| jid.domain().to_string());
        Ok(ServerAddress::new(
            &host,
            self.server.port.unwrap_or(DEFAULT_PORT),
        ))
    }

    /// Parsed master users (bare addresses).
    pub fn master_users(&self) -> Result<Vec<Jid>> {
        self.bot
            .users
            .iter()
            .map(|u| {
                u.parse::<Jid>()
                    .map(|j| j.bare())
                    .map_err(|e| anyhow!("Invalid master user {}: {}", u, e))
            })
            .collect()
    }

    /// Check everything that would otherwise fail later at connect/join time.
    pub fn validate(&self) -> Result<()> {
        self.bot_jid()?;
        if self.bot.password.is_empty() {
            return Err(anyhow!("Bot password must not be empty"));
        }
        if let Some(resource) = &self.bot.resource {
            validate_resource(resource)
                .map_err(|e| anyhow!("Invalid resource {:?}: {}", resource, e))?;
        }
        for room in &self.bot.rooms {
            split_room_id(room).map_err(|e| anyhow!("{}", e))?;
        }
        self.master_users()?;
        if let Some(prefix) = &self.bot.command_prefix {
            if normalize_prefix(Some(prefix)).to_string() != prefix.trim() {
                return Err(anyhow!(
                    "Unsupported command prefix {:?} (allowed: ! ^ + $ / >)",
                    prefix
                ));
            }
        }
        if self.server.port == Some(0) {
            return Err(anyhow!("Server port must be non-zero"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                jid: "bot@example.com".to_string(),
                password: "changeme".to_string(),
                resource: None,
                resource_prefix: default_resource_prefix(),
                rooms: vec!["lobby@conference.example.com".to_string()],
                users: vec!["owner@example.com".to_string()],
                command_prefix: Some("!".to_string()),
                idle_interval_secs: default_idle_interval(),
                join_timeout_secs: default_join_timeout(),
            },
            server: ServerConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("mucbot.log".to_string()),
                security_file: Some("mucbot-security.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.bot.effective_command_prefix(), '!');
        assert_eq!(config.bot.idle_interval(), Some(Duration::from_secs(60)));
        assert_eq!(config.bot.join_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_server_address_defaults_to_jid_domain() {
        let config = Config::default();
        let addr = config.server_address().unwrap();
        assert_eq!(addr, ServerAddress::new("example.com", 5222));
    }

    #[test]
    fn test_server_address_override() {
        let mut config = Config::default();
        config.server.host = Some("talk.example.net".into());
        config.server.port = Some(5223);
        assert_eq!(
            config.server_address().unwrap(),
            ServerAddress::new("talk.example.net", 5223)
        );
        // Port alone keeps the jid domain
        config.server.host = None;
        assert_eq!(
            config.server_address().unwrap(),
            ServerAddress::new("example.com", 5223)
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.bot.rooms.push("no-at-sign".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.command_prefix = Some("#".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.resource = Some("two words".into());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.jid = "example.com".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bot.password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_disables_timers() {
        let mut config = Config::default();
        config.bot.idle_interval_secs = 0;
        config.bot.join_timeout_secs = 0;
        assert_eq!(config.bot.idle_interval(), None);
        assert_eq!(config.bot.join_timeout(), None);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let raw = r#"
            [bot]
            jid = "bot@example.com"
            password = "pw"

            [logging]
            level = "debug"
            file = "x.log"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.bot.rooms.is_empty());
        assert_eq!(config.bot.resource_prefix, "mucbot");
        assert_eq!(config.bot.idle_interval_secs, 60);
        assert!(config.server.host.is_none());
        assert!(config.logging.security_file.is_none());
        config.validate().unwrap();
    }
}
