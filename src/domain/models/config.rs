//! Service configuration, constructed once at startup and passed by
//! reference into each component.

use serde::{Deserialize, Serialize};

use crate::domain::scoring::ScoreConfig;

/// Main configuration structure for Promptwright.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generative rewrite endpoint configuration
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Agent metrics endpoint configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Improvement score weights and caps
    #[serde(default)]
    pub score: ScoreConfig,

    /// Objective derivation rules
    #[serde(default)]
    pub objectives: ObjectivesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            generator: GeneratorConfig::default(),
            metrics: MetricsConfig::default(),
            score: ScoreConfig::default(),
            objectives: ObjectivesConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".promptwright/promptwright.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Generative rewrite endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// Provider name; only the chat-completions provider below is supported
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Chat-completions endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key; when absent the client returns a deterministic mock
    /// response so the pipeline still runs end-to-end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Default max tokens per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "together".to_string()
}

fn default_endpoint() -> String {
    "https://api.together.xyz/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "Qwen/Qwen3-Next-80B-A3B-Instruct".to_string()
}

const fn default_max_tokens() -> u32 {
    512
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_generator_timeout() -> u64 {
    60
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

/// Agent metrics endpoint configuration. The base URL is optional: with
/// no endpoint configured, conversion-delta scoring is inert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Base URL of the agent metrics service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Fetch timeout in seconds
    #[serde(default = "default_metrics_timeout")]
    pub timeout_secs: u64,
}

const fn default_metrics_timeout() -> u64 {
    5
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_metrics_timeout(),
        }
    }
}

/// Objective derivation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ObjectivesConfig {
    /// Path to the failure-reason to objectives rule table
    #[serde(default = "default_rules_path")]
    pub rules_path: String,
}

fn default_rules_path() -> String {
    "data/objective_rules.json".to_string()
}

impl Default for ObjectivesConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
        }
    }
}
