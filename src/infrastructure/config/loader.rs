//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Generator endpoint cannot be empty")]
    EmptyGeneratorEndpoint,

    #[error("Invalid generator timeout: {0}. Must be at least 1 second")]
    InvalidGeneratorTimeout(u64),

    #[error("Invalid score configuration: {0}")]
    InvalidScoreConfig(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .promptwright/config.yaml (project config, created by init)
    /// 3. .promptwright/local.yaml (local overrides, optional)
    /// 4. Environment variables (`PROMPTWRIGHT_` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".promptwright/config.yaml"))
            .merge(Yaml::file(".promptwright/local.yaml"))
            .merge(Env::prefixed("PROMPTWRIGHT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.generator.endpoint.is_empty() {
            return Err(ConfigError::EmptyGeneratorEndpoint);
        }
        if config.generator.timeout_secs == 0 {
            return Err(ConfigError::InvalidGeneratorTimeout(
                config.generator.timeout_secs,
            ));
        }

        if config.score.max_total <= 0.0 {
            return Err(ConfigError::InvalidScoreConfig(format!(
                "max_total must be positive, got {}",
                config.score.max_total
            )));
        }
        if config.score.prompt_length_reference <= 0.0 {
            return Err(ConfigError::InvalidScoreConfig(format!(
                "prompt_length_reference must be positive, got {}",
                config.score.prompt_length_reference
            )));
        }

        Ok(())
    }
}
