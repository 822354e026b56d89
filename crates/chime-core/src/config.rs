use std::time::Duration;

use anyhow::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, FileFormat};
use serde::Deserialize;

use crate::constants::DEFAULT_TICK_INTERVAL_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub host: HostConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
}

/// Chat host the notifications are delivered through.
#[derive(Clone, Deserialize)]
pub struct HostConfig {
    /// Base URL of the host, without a trailing `/api/v4`.
    pub url: String,
    /// Bot access token.
    pub token: String,
    /// User id the bot posts as.
    pub bot_user_id: String,
}

impl std::fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("bot_user_id", &self.bot_user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
}

impl SchedulerConfig {
    /// ## Summary
    /// Returns the ticker period, never shorter than one second.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("database.max_connections", 4)?
            .set_default("scheduler.tick_interval_secs", DEFAULT_TICK_INTERVAL_SECS)?
            .set_default("logging.level", "debug")?)
    }

    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables use the `CHIME_` prefix and `__` between sections,
    /// e.g. `CHIME_HOST__BOT_USER_ID`.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::builder()?
            .add_source(
                config::Environment::with_prefix("CHIME")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    /// ## Summary
    /// Builds settings from TOML text layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the text is not valid TOML or required keys are missing.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(Self::builder()?
            .add_source(config::File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env file loaded");
    }

    Settings::load()
}
