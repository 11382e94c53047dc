//! Prompt repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OptimizationRun, PromptVersion, RunStatus, StoreMetrics};
use crate::domain::scoring::ScoreComponents;

/// Fields for a new optimization run row.
#[derive(Debug, Clone)]
pub struct NewRun {
    /// Version the run is attached to; must already exist in the store.
    pub prompt_version: String,
    pub status: RunStatus,
    pub alert_id: Option<String>,
    pub model: String,
    pub previous_version: Option<String>,
    pub new_version: Option<String>,
    pub improvement: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub notes: Option<String>,
    pub score_components: Option<ScoreComponents>,
    pub conversion_snapshot: Option<serde_json::Value>,
}

/// Repository interface for prompt versions and optimization runs.
///
/// Implementations must guarantee that `create_prompt` flips the active
/// flag atomically: at no observable point are two versions active, and
/// once a version has been created there is always exactly one.
#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Most recently created active version, or none before any seed.
    async fn get_active_prompt(&self) -> DomainResult<Option<PromptVersion>>;

    /// Versions newest first, up to `limit`.
    async fn list_prompts(&self, limit: i64) -> DomainResult<Vec<PromptVersion>>;

    /// Deactivate every active version and insert the new one as active,
    /// in one transaction.
    async fn create_prompt(
        &self,
        version: &str,
        content: &str,
        notes: Option<&str>,
    ) -> DomainResult<PromptVersion>;

    /// Append a run row linked to an existing version. `completed_at` is
    /// set iff the status is `Completed` at creation time.
    async fn log_run(&self, run: NewRun) -> DomainResult<OptimizationRun>;

    /// Runs newest first, up to `limit`.
    async fn recent_runs(&self, limit: i64) -> DomainResult<Vec<OptimizationRun>>;

    /// Aggregate metrics over all stored runs.
    async fn metrics(&self) -> DomainResult<StoreMetrics>;
}
