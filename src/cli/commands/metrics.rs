//! Implementation of the `promptwright metrics` command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{presets, ContentArrangement, Table};

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{OptimizationRun, StoreMetrics};
use crate::domain::ports::PromptRepository;

/// Runs included in the report, matching the service metrics view.
const RECENT_RUNS_LIMIT: i64 = 10;

#[derive(Args, Debug)]
pub struct MetricsArgs {}

#[derive(Debug, serde::Serialize)]
pub struct RunSummary {
    pub id: i64,
    pub status: String,
    pub model: String,
    pub improvement: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<&OptimizationRun> for RunSummary {
    fn from(run: &OptimizationRun) -> Self {
        Self {
            id: run.id,
            status: run.status.as_str().to_string(),
            model: run.model.clone(),
            improvement: run.improvement,
            duration_seconds: run.duration_seconds,
            created_at: run.created_at,
            completed_at: run.completed_at,
            notes: run.notes.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct MetricsOutput {
    #[serde(flatten)]
    pub metrics: StoreMetrics,
    pub active_prompt_version: Option<String>,
    pub active_prompt_created_at: Option<DateTime<Utc>>,
    pub recent_runs: Vec<RunSummary>,
}

impl CommandOutput for MetricsOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Total runs: {}", self.metrics.total_runs),
            format!("Success rate: {:.2}", self.metrics.success_rate),
            format!("Average improvement: {:.4}", self.metrics.average_improvement),
        ];
        if let Some(version) = &self.active_prompt_version {
            lines.push(format!("Active prompt: {version}"));
        }
        if let Some(last_run) = &self.metrics.last_run_timestamp {
            lines.push(format!("Last run: {}", last_run.to_rfc3339()));
        }

        if self.recent_runs.is_empty() {
            lines.push("\nNo optimization runs recorded.".to_string());
        } else {
            let mut table = Table::new();
            table
                .load_preset(presets::UTF8_BORDERS_ONLY)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "Status", "Improvement", "Duration", "Created", "Notes"]);
            for run in &self.recent_runs {
                table.add_row(vec![
                    run.id.to_string(),
                    run.status.clone(),
                    run.improvement
                        .map_or_else(|| "-".to_string(), |v| format!("{v:.4}")),
                    run.duration_seconds
                        .map_or_else(|| "-".to_string(), |v| format!("{v:.2}s")),
                    run.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    run.notes
                        .as_deref()
                        .map_or_else(String::new, |n| truncate(n, 48)),
                ]);
            }
            lines.push(String::new());
            lines.push(table.to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(_args: MetricsArgs, json_mode: bool) -> Result<()> {
    let config = super::load_config()?;
    let repository = super::open_repository(&config).await?;

    let metrics = repository.metrics().await?;
    let active = repository.get_active_prompt().await?;
    let runs = repository.recent_runs(RECENT_RUNS_LIMIT).await?;

    output(
        &MetricsOutput {
            metrics,
            active_prompt_version: active.as_ref().map(|p| p.version.clone()),
            active_prompt_created_at: active.as_ref().map(|p| p.created_at),
            recent_runs: runs.iter().map(RunSummary::from).collect(),
        },
        json_mode,
    );
    Ok(())
}
