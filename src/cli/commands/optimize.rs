//! Implementation of the `promptwright optimize` command.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Read;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{OptimizationPayload, OptimizationResult};

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    /// Path to an OptimizationPayload JSON file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    pub payload: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct OptimizeOutput {
    pub status: String,
    #[serde(flatten)]
    pub result: OptimizationResult,
}

impl CommandOutput for OptimizeOutput {
    fn to_human(&self) -> String {
        let result = &self.result;
        let mut lines = vec![format!(
            "Run {} completed: {} -> {}",
            result.run_id,
            result.previous_version.as_deref().unwrap_or("-"),
            result.new_version
        )];
        lines.push(format!(
            "Improvement: {:.4} ({:.2}s)",
            result.improvement, result.duration_seconds
        ));
        if let Some(alert_id) = &result.alert_id {
            lines.push(format!("Alert: {alert_id}"));
        }
        lines.push(String::new());
        lines.push("Prompt preview:".to_string());
        lines.push(result.prompt_preview.clone());
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn read_payload(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read payload from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))
    }
}

pub async fn execute(args: OptimizeArgs, json_mode: bool) -> Result<()> {
    let raw = read_payload(&args.payload)?;
    let payload = OptimizationPayload::from_json(&raw)?;

    let config = super::load_config()?;
    let repository = super::open_repository(&config).await?;
    let optimizer = super::build_optimizer(&config, repository)?;

    let result = optimizer.optimize(payload).await?;

    output(
        &OptimizeOutput {
            status: "completed".to_string(),
            result,
        },
        json_mode,
    );
    Ok(())
}
