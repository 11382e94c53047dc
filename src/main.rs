//! Promptwright CLI entry point.

use clap::Parser;

use promptwright::cli::{Cli, Commands};
use promptwright::domain::models::LoggingConfig;

#[tokio::main]
async fn main() {
    // Logging comes up before config loading so loader failures are
    // visible; the level honors RUST_LOG when set.
    let _ = promptwright::infrastructure::logging::init(&LoggingConfig::default());

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => promptwright::cli::commands::init::execute(args, cli.json).await,
        Commands::Optimize(args) => {
            promptwright::cli::commands::optimize::execute(args, cli.json).await
        }
        Commands::Metrics(args) => {
            promptwright::cli::commands::metrics::execute(args, cli.json).await
        }
        Commands::Prompts(args) => {
            promptwright::cli::commands::prompts::execute(args, cli.json).await
        }
    };

    if let Err(err) = result {
        promptwright::cli::handle_error(err, cli.json);
    }
}
