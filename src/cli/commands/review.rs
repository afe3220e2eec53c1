//! Review CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::commands::task::TaskSummary;
use crate::cli::context::open_context;
use crate::cli::output::{describe_cascade, output, CommandOutput};
use crate::services::CascadeReport;

/// Arguments for `caseflow review`.
#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(subcommand)]
    pub command: ReviewCommands,
}

/// Review subcommands.
#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// Accept the agent output and complete the task
    Approve {
        /// Task ID
        id: Uuid,
        #[arg(long)]
        reviewer: Uuid,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject the agent output and send the task back to pending
    Reject {
        /// Task ID
        id: Uuid,
        #[arg(long)]
        reviewer: Uuid,
        /// Why the output was rejected
        #[arg(long)]
        notes: String,
    },
}

/// Result of a review decision.
#[derive(Debug, serde::Serialize)]
pub struct ReviewOutput {
    pub success: bool,
    pub decision: &'static str,
    pub task: TaskSummary,
    pub cascade: CascadeReport,
}

impl CommandOutput for ReviewOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Review {}.", self.decision)];
        lines.extend(self.task.lines());
        lines.extend(describe_cascade(&self.cascade));
        lines.join("\n")
    }
}

/// Run a review subcommand.
pub async fn execute(args: ReviewArgs, json_mode: bool) -> Result<()> {
    let ctx = open_context().await?;

    let out = match args.command {
        ReviewCommands::Approve { id, reviewer, notes } => {
            let approval = ctx.engine.approve_review(id, reviewer, notes).await?;
            ReviewOutput {
                success: true,
                decision: "approved",
                task: TaskSummary::from(&approval.task),
                cascade: approval.cascade,
            }
        }
        ReviewCommands::Reject { id, reviewer, notes } => {
            let task = ctx.engine.reject_review(id, reviewer, notes).await?;
            ReviewOutput {
                success: true,
                decision: "rejected",
                task: TaskSummary::from(&task),
                cascade: CascadeReport::default(),
            }
        }
    };
    output(&out, json_mode);
    Ok(())
}
