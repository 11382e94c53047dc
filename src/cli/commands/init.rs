//! Implementation of the `promptwright init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub config_written: bool,
    pub database_path: String,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("Wrote {}", self.config_path.display()));
        } else {
            lines.push(format!(
                "Kept existing {} (use --force to overwrite)",
                self.config_path.display()
            ));
        }
        lines.push(format!("Database initialized at {}", self.database_path));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let config_dir = PathBuf::from(".promptwright");
    fs::create_dir_all(&config_dir)
        .await
        .context("Failed to create .promptwright directory")?;

    let config_path = config_dir.join("config.yaml");
    let config_written = if args.force || !config_path.exists() {
        let defaults =
            serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
        fs::write(&config_path, defaults)
            .await
            .context("Failed to write config file")?;
        true
    } else {
        false
    };

    let config = ConfigLoader::load()?;
    let pool = crate::adapters::sqlite::initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    output(
        &InitOutput {
            success: true,
            message: "Promptwright initialized.".to_string(),
            config_path,
            config_written,
            database_path: config.database.path,
        },
        json_mode,
    );
    Ok(())
}
