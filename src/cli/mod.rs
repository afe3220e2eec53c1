//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

pub use context::{open_context, AppContext};
pub use output::{output, CommandOutput};

use crate::domain::errors::DomainError;

#[derive(Parser, Debug)]
#[command(
    name = "caseflow",
    version,
    about = "Hierarchical case workflows with auto-progression and agent automation"
)]
/// Top-level command line.
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of tables
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a caseflow project in a directory
    Init(commands::init::InitArgs),
    /// Import, inspect and list workflows
    Workflow(commands::workflow::WorkflowArgs),
    /// Operate on tasks, subtasks and checklist items
    Task(commands::task::TaskArgs),
    /// Approve or reject agent output awaiting review
    Review(commands::review::ReviewArgs),
    /// Manage agent installations
    Agent(commands::agent::AgentArgs),
    /// Manage LLM configurations
    Llm(commands::llm::LlmArgs),
}

/// Print the error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let kind = err
        .downcast_ref::<DomainError>()
        .map_or("error", error_kind);

    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "kind": kind,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}

fn error_kind(err: &DomainError) -> &'static str {
    match err {
        DomainError::Validation(_) => "validation",
        DomainError::NotFound { .. } => "not_found",
        DomainError::NotInstalled { .. } => "not_installed",
        DomainError::Configuration(_) => "configuration",
        DomainError::Adapter(_) => "adapter",
        DomainError::Timeout(_) => "timeout",
        DomainError::InvalidState(_) => "invalid_state",
        DomainError::ConcurrencyConflict { .. } => "concurrency_conflict",
        DomainError::Database(_) => "database",
        DomainError::Serialization(_) => "serialization",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["caseflow", "agent", "list", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Agent(_)));
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(error_kind(&DomainError::task_not_found(uuid::Uuid::nil())), "not_found");
        assert_eq!(error_kind(&DomainError::Validation("x".into())), "validation");
    }
}
