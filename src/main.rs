//! Caseflow CLI entry point.

use clap::Parser;

use caseflow::cli::{commands, Cli, Commands};
use caseflow::infrastructure::config::ConfigLoader;
use caseflow::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _logger = init_logging();

    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, cli.json).await,
        Commands::Workflow(args) => commands::workflow::execute(args, cli.json).await,
        Commands::Task(args) => commands::task::execute(args, cli.json).await,
        Commands::Review(args) => commands::review::execute(args, cli.json).await,
        Commands::Agent(args) => commands::agent::execute(args, cli.json).await,
        Commands::Llm(args) => commands::llm::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        caseflow::cli::handle_error(err, cli.json);
    }
}

/// Configured logging, falling back to console only when the log
/// directory is unusable (e.g. before `caseflow init`).
fn init_logging() -> Option<LoggerImpl> {
    let config = ConfigLoader::load()
        .map(|c| LogConfig::from(&c.logging))
        .unwrap_or_default();

    match LoggerImpl::init(&config) {
        Ok(logger) => Some(logger),
        Err(_) if config.log_dir.is_some() => LoggerImpl::init(&LogConfig {
            log_dir: None,
            ..config
        })
        .ok(),
        Err(_) => None,
    }
}
