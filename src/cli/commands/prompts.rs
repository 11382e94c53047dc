//! Implementation of the `promptwright prompts` command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{presets, ContentArrangement, Table};

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::PromptVersion;
use crate::domain::ports::PromptRepository;

/// Characters of prompt content included in each listing entry.
const PREVIEW_CHARS: usize = 600;

#[derive(Args, Debug)]
pub struct PromptsArgs {
    /// Maximum number of versions to display
    #[arg(short, long, default_value = "10")]
    pub limit: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct PromptSummary {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub preview: String,
}

impl From<&PromptVersion> for PromptSummary {
    fn from(prompt: &PromptVersion) -> Self {
        Self {
            version: prompt.version.clone(),
            created_at: prompt.created_at,
            notes: prompt.notes.clone(),
            is_active: prompt.is_active,
            preview: prompt.content.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PromptListOutput {
    pub items: Vec<PromptSummary>,
}

impl CommandOutput for PromptListOutput {
    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return "No prompt versions stored.".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Version", "Active", "Created", "Notes", "Preview"]);
        for prompt in &self.items {
            table.add_row(vec![
                prompt.version.clone(),
                if prompt.is_active { "*".to_string() } else { String::new() },
                prompt.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                prompt
                    .notes
                    .as_deref()
                    .map_or_else(String::new, |n| truncate(n, 32)),
                truncate(&prompt.preview, 64),
            ]);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: PromptsArgs, json_mode: bool) -> Result<()> {
    let config = super::load_config()?;
    let repository = super::open_repository(&config).await?;

    let prompts = repository.list_prompts(args.limit).await?;
    output(
        &PromptListOutput {
            items: prompts.iter().map(PromptSummary::from).collect(),
        },
        json_mode,
    );
    Ok(())
}
