//! Prompt version and optimization run domain models.
//!
//! A prompt version is an immutable named snapshot of the agent
//! instruction text; at most one version is active at a time. An
//! optimization run is the append-only audit record of one attempt to
//! produce a new version, including its score breakdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::scoring::ScoreComponents;

/// Status of an optimization run.
///
/// The orchestrator only ever writes `Completed`; the other states are
/// representable in storage but unused by the core flow. A cycle that
/// fails before persisting leaves no run row at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A named, immutable snapshot of the agent prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub version: String,
    pub content: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Audit record of one optimization cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRun {
    pub id: i64,
    pub prompt_version: String,
    pub alert_id: Option<String>,
    pub status: RunStatus,
    pub model: String,
    pub previous_version: Option<String>,
    pub new_version: Option<String>,
    pub improvement: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub notes: Option<String>,
    pub score_components: Option<ScoreComponents>,
    pub conversion_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate view over all stored runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetrics {
    pub total_runs: i64,
    /// Completed runs over total runs; 0.0 when no runs exist.
    pub success_rate: f64,
    /// Mean over runs with a non-null improvement; 0.0 when none.
    pub average_improvement: f64,
    pub last_run_timestamp: Option<DateTime<Utc>>,
    /// Per-component arithmetic mean across runs carrying score
    /// components; all zeros when none do.
    pub score_breakdown: ScoreComponents,
    /// Conversion snapshot of the most recently created run.
    pub latest_conversion_snapshot: Option<serde_json::Value>,
}

impl StoreMetrics {
    pub fn empty() -> Self {
        Self {
            total_runs: 0,
            success_rate: 0.0,
            average_improvement: 0.0,
            last_run_timestamp: None,
            score_breakdown: ScoreComponents::default(),
            latest_conversion_snapshot: None,
        }
    }
}
