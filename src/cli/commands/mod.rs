//! CLI command implementations.

pub mod init;
pub mod metrics;
pub mod optimize;
pub mod prompts;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::llm::ChatCompletionsClient;
use crate::adapters::metrics::HttpMetricsSource;
use crate::adapters::sqlite::{initialize_database, SqlitePromptRepository};
use crate::domain::models::Config;
use crate::domain::ports::MetricsSource;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{ObjectiveRules, PromptOptimizer};

/// Load configuration and open the store. Shared by every command that
/// touches persistence.
pub(crate) async fn open_repository(config: &Config) -> Result<SqlitePromptRepository> {
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database. Run 'promptwright init' first.")?;
    Ok(SqlitePromptRepository::new(pool))
}

pub(crate) fn load_config() -> Result<Config> {
    ConfigLoader::load()
}

/// Assemble the optimizer and its collaborators from configuration.
pub(crate) fn build_optimizer(
    config: &Config,
    repository: SqlitePromptRepository,
) -> Result<PromptOptimizer> {
    let generator = ChatCompletionsClient::new(config.generator.clone())
        .context("Failed to build generation client")?;
    let metrics_source: Option<Arc<dyn MetricsSource>> =
        HttpMetricsSource::from_config(&config.metrics)
            .context("Failed to build metrics client")?
            .map(|source| Arc::new(source) as Arc<dyn MetricsSource>);
    let objective_rules = ObjectiveRules::load(&config.objectives.rules_path);

    Ok(PromptOptimizer::new(
        Arc::new(repository),
        Arc::new(generator),
        metrics_source,
        objective_rules,
        config.score.clone(),
    ))
}
