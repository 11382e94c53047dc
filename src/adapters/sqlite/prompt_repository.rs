//! SQLite implementation of the PromptRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{parse_datetime, parse_optional_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OptimizationRun, PromptVersion, RunStatus, StoreMetrics};
use crate::domain::ports::{NewRun, PromptRepository};
use crate::domain::scoring::ScoreComponents;

#[derive(Clone)]
pub struct SqlitePromptRepository {
    pool: SqlitePool,
}

impl SqlitePromptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromptRepository for SqlitePromptRepository {
    async fn get_active_prompt(&self) -> DomainResult<Option<PromptVersion>> {
        let row: Option<PromptRow> = sqlx::query_as(
            "SELECT version, content, notes, created_at, is_active FROM prompts
             WHERE is_active = 1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_prompts(&self, limit: i64) -> DomainResult<Vec<PromptVersion>> {
        let rows: Vec<PromptRow> = sqlx::query_as(
            "SELECT version, content, notes, created_at, is_active FROM prompts
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_prompt(
        &self,
        version: &str,
        content: &str,
        notes: Option<&str>,
    ) -> DomainResult<PromptVersion> {
        let created_at = Utc::now();

        // Deactivate-then-insert must be atomic so interleaved calls can
        // never observe two active versions or lose a deactivation.
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE prompts SET is_active = 0 WHERE is_active = 1")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO prompts (version, content, notes, created_at, is_active)
             VALUES (?, ?, ?, ?, 1)",
        )
        .bind(version)
        .bind(content)
        .bind(notes)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(PromptVersion {
            version: version.to_string(),
            content: content.to_string(),
            notes: notes.map(str::to_string),
            created_at,
            is_active: true,
        })
    }

    async fn log_run(&self, run: NewRun) -> DomainResult<OptimizationRun> {
        let prompt_id: Option<(i64,)> = sqlx::query_as("SELECT id FROM prompts WHERE version = ?")
            .bind(&run.prompt_version)
            .fetch_optional(&self.pool)
            .await?;
        let Some((prompt_id,)) = prompt_id else {
            return Err(DomainError::UnknownVersion(run.prompt_version));
        };

        let created_at = Utc::now();
        let completed_at = (run.status == RunStatus::Completed).then_some(created_at);
        let score_components_json = run
            .score_components
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let conversion_snapshot_json = run
            .conversion_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            "INSERT INTO optimization_runs
             (prompt_id, alert_id, status, model, previous_version, new_version,
              improvement, duration_seconds, notes, score_components, conversion_snapshot,
              created_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(prompt_id)
        .bind(&run.alert_id)
        .bind(run.status.as_str())
        .bind(&run.model)
        .bind(&run.previous_version)
        .bind(&run.new_version)
        .bind(run.improvement)
        .bind(run.duration_seconds)
        .bind(&run.notes)
        .bind(&score_components_json)
        .bind(&conversion_snapshot_json)
        .bind(created_at.to_rfc3339())
        .bind(completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(OptimizationRun {
            id: result.last_insert_rowid(),
            prompt_version: run.prompt_version,
            alert_id: run.alert_id,
            status: run.status,
            model: run.model,
            previous_version: run.previous_version,
            new_version: run.new_version,
            improvement: run.improvement,
            duration_seconds: run.duration_seconds,
            notes: run.notes,
            score_components: run.score_components,
            conversion_snapshot: run.conversion_snapshot,
            created_at,
            completed_at,
        })
    }

    async fn recent_runs(&self, limit: i64) -> DomainResult<Vec<OptimizationRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(
            "SELECT r.id, p.version AS prompt_version, r.alert_id, r.status, r.model,
                    r.previous_version, r.new_version, r.improvement, r.duration_seconds,
                    r.notes, r.score_components, r.conversion_snapshot,
                    r.created_at, r.completed_at
             FROM optimization_runs r
             JOIN prompts p ON p.id = r.prompt_id
             ORDER BY r.created_at DESC, r.id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn metrics(&self) -> DomainResult<StoreMetrics> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM optimization_runs")
            .fetch_one(&self.pool)
            .await?;
        let (completed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM optimization_runs WHERE status = ?")
                .bind(RunStatus::Completed.as_str())
                .fetch_one(&self.pool)
                .await?;
        let improvements: Vec<(f64,)> = sqlx::query_as(
            "SELECT improvement FROM optimization_runs WHERE improvement IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        let last_run: Option<(String,)> = sqlx::query_as(
            "SELECT created_at FROM optimization_runs ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let component_rows: Vec<(String,)> = sqlx::query_as(
            "SELECT score_components FROM optimization_runs WHERE score_components IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        // Tolerate rows written before the score columns existed or with
        // unreadable JSON; they simply don't contribute to the mean.
        let components: Vec<ScoreComponents> = component_rows
            .into_iter()
            .filter_map(|(raw,)| serde_json::from_str(&raw).ok())
            .collect();

        let latest_snapshot: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT conversion_snapshot FROM optimization_runs
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        let latest_conversion_snapshot = latest_snapshot
            .and_then(|(raw,)| raw)
            .and_then(|raw| serde_json::from_str(&raw).ok());

        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total > 0 {
            completed as f64 / total as f64
        } else {
            0.0
        };
        #[allow(clippy::cast_precision_loss)]
        let average_improvement = if improvements.is_empty() {
            0.0
        } else {
            improvements.iter().map(|(v,)| v).sum::<f64>() / improvements.len() as f64
        };

        Ok(StoreMetrics {
            total_runs: total,
            success_rate,
            average_improvement,
            last_run_timestamp: last_run.map(|(raw,)| parse_datetime(&raw)).transpose()?,
            score_breakdown: ScoreComponents::mean(&components),
            latest_conversion_snapshot,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PromptRow {
    version: String,
    content: String,
    notes: Option<String>,
    created_at: String,
    is_active: i64,
}

impl TryFrom<PromptRow> for PromptVersion {
    type Error = DomainError;

    fn try_from(row: PromptRow) -> Result<Self, Self::Error> {
        Ok(PromptVersion {
            version: row.version,
            content: row.content,
            notes: row.notes,
            created_at: parse_datetime(&row.created_at)?,
            is_active: row.is_active != 0,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    id: i64,
    prompt_version: String,
    alert_id: Option<String>,
    status: String,
    model: String,
    previous_version: Option<String>,
    new_version: Option<String>,
    improvement: Option<f64>,
    duration_seconds: Option<f64>,
    notes: Option<String>,
    score_components: Option<String>,
    conversion_snapshot: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl TryFrom<RunRow> for OptimizationRun {
    type Error = DomainError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let status = RunStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::SerializationError(format!("Invalid run status: {}", row.status))
        })?;
        let score_components = row
            .score_components
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        let conversion_snapshot = row
            .conversion_snapshot
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());

        Ok(OptimizationRun {
            id: row.id,
            prompt_version: row.prompt_version,
            alert_id: row.alert_id,
            status,
            model: row.model,
            previous_version: row.previous_version,
            new_version: row.new_version,
            improvement: row.improvement,
            duration_seconds: row.duration_seconds,
            notes: row.notes,
            score_components,
            conversion_snapshot,
            created_at: parse_datetime(&row.created_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}
