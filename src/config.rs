use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

use crate::policy::ExtremumPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub telegram: TelegramConfig,
    pub policy: PolicyConfig,
    /// Optional bootstrap target registered at startup.
    pub watch: Option<WatchConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub request_timeout: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub initial_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub extremum: ExtremumPolicy,
    pub report_unchanged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub url: String,
    /// Defaults to the configured Telegram chat when absent.
    pub destination: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_dir("config")
    }

    pub fn from_dir(dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name(&format!("{}/default", dir)))
            // Add environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            // Add environment variables with prefix "VIGIA"
            .add_source(Environment::with_prefix("VIGIA").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate database configuration
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "Database min_connections cannot exceed max_connections".into(),
            ));
        }

        // Validate scraper configuration
        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Scraper request_timeout must be greater than 0".into(),
            ));
        }

        if self.scraper.user_agent.is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must be set".into()));
        }

        // Validate scheduler configuration
        if self.scheduler.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Scheduler poll_interval_secs must be greater than 0".into(),
            ));
        }

        // Validate Telegram configuration
        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(ConfigError::Message(
                "Invalid Telegram api_base URL format".into(),
            ));
        }

        // Validate bootstrap target
        if let Some(watch) = &self.watch {
            if Url::parse(&watch.url).is_err() {
                return Err(ConfigError::Message("Invalid watch URL format".into()));
            }
        }

        Ok(())
    }
}
