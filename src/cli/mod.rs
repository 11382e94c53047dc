//! Command-line interface for the prompt optimization service.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::domain::errors::DomainError;

#[derive(Parser)]
#[command(name = "promptwright")]
#[command(about = "Promptwright - prompt optimization service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize Promptwright configuration and database
    Init(commands::init::InitArgs),

    /// Run one optimization cycle from a payload file
    Optimize(commands::optimize::OptimizeArgs),

    /// Show store metrics and recent optimization runs
    Metrics(commands::metrics::MetricsArgs),

    /// List stored prompt versions
    Prompts(commands::prompts::PromptsArgs),
}

/// Print the error and exit. Validation errors use a distinct exit code
/// so callers can tell a bad request from an internal failure.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let exit_code = err
        .downcast_ref::<DomainError>()
        .map_or(1, |domain_err| if domain_err.is_validation() { 2 } else { 1 });

    if json_mode {
        println!(
            "{}",
            serde_json::json!({ "error": format!("{err:#}") })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(exit_code);
}
