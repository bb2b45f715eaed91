//! Configuration for routewatch.
//!
//! Everything is env-driven (with `.env` support via dotenvy). The bot
//! token is the only required value; the rest has working defaults.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Main configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    pub roster: RosterConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            telegram: TelegramConfig::from_env()?,
            roster: RosterConfig::from_env()?,
        })
    }
}

/// Embedded database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path of the SQLite file. Created on first start if absent.
    pub path: PathBuf,
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let path = optional_env("DATABASE_PATH")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("work_reasons.db"));
        Ok(Self { path })
    }
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: SecretString,
    /// API base URL. Overridable so tests can point at a mock server.
    pub api_base: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let token =
            optional_env("TELEGRAM_BOT_TOKEN")?.ok_or_else(|| ConfigError::MissingRequired {
                key: "TELEGRAM_BOT_TOKEN".to_string(),
                hint: "Set TELEGRAM_BOT_TOKEN to the token issued by @BotFather".to_string(),
            })?;

        let api_base = optional_env("TELEGRAM_API_BASE")?
            .unwrap_or_else(|| "https://api.telegram.org".to_string());
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "TELEGRAM_API_BASE".to_string(),
                message: "must be an http(s) URL".to_string(),
            });
        }

        let poll_timeout = optional_env("TELEGRAM_POLL_TIMEOUT_SECS")?
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "TELEGRAM_POLL_TIMEOUT_SECS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?
            .unwrap_or(30);

        Ok(Self {
            token: SecretString::from(token),
            api_base: api_base.trim_end_matches('/').to_string(),
            poll_timeout: Duration::from_secs(poll_timeout),
        })
    }

    /// Get the bot token (exposes the secret).
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Supervisor roster configuration.
///
/// Adding or removing a supervisor is a configuration change, not a code
/// change: `SUPERVISORS=tatiana,ivan`.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    /// Canonical supervisor names, lowercased, in declaration order.
    pub supervisors: Vec<String>,
}

impl RosterConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = optional_env("SUPERVISORS")?.unwrap_or_else(|| "tatiana,ivan".to_string());
        let supervisors: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if supervisors.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "SUPERVISORS".to_string(),
                message: "must list at least one supervisor name".to_string(),
            });
        }

        Ok(Self { supervisors })
    }
}

/// Read an environment variable, treating an empty value as unset.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}
