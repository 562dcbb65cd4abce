//! # cbx-config
//!
//! Layered service configuration: built-in defaults, then a `.env` file,
//! then `CBX__`-prefixed environment variables (`CBX__SERVER__PORT=9000`).

use std::time::Duration;

use chrono::format::{Item, StrftimeItems};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration could not be read: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection string, e.g. `sqlite:coblocks.db` or `sqlite::memory:`
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteSettings {
    /// Base URL used to build term and post permalinks
    pub url: String,
    /// chrono format string for the human readable post date
    pub date_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSettings {
    pub timeout_secs: u64,
    /// Total attempts for transient failures, including the first
    pub max_attempts: u32,
    pub retry_base_ms: u64,
}

impl FeedSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub feed: FeedSettings,
    /// env_logger filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Settings {
    /// Reads `.env` (if present) and the process environment on top of the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        let builder = Self::defaults()?.add_source(
            Environment::with_prefix("CBX").separator("__").try_parsing(true),
        );
        Self::from_builder(builder)
    }

    /// Builder holding only the built-in defaults. Callers may add sources or
    /// overrides before handing it to [`Settings::from_builder`].
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.url", "sqlite:coblocks.db")?
            .set_default("site.url", "http://localhost:8080")?
            .set_default("site.date_format", "%B %-d, %Y")?
            .set_default("feed.timeout_secs", 10_i64)?
            .set_default("feed.max_attempts", 3_i64)?
            .set_default("feed.retry_base_ms", 200_i64)?
            .set_default("log_level", "info")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "feed.max_attempts",
                reason: "at least one attempt is required".into(),
            });
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "feed.timeout_secs",
                reason: "timeout must be positive".into(),
            });
        }
        if self.site.url.trim().is_empty() {
            return Err(ConfigError::Invalid { key: "site.url", reason: "must not be empty".into() });
        }
        if StrftimeItems::new(&self.site.date_format).any(|item| item == Item::Error) {
            return Err(ConfigError::Invalid {
                key: "site.date_format",
                reason: format!("{:?} is not a valid strftime pattern", self.site.date_format),
            });
        }
        Ok(())
    }

    /// Site URL without a trailing slash.
    pub fn site_url(&self) -> &str {
        self.site.url.trim_end_matches('/')
    }
}
