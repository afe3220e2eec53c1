//! Task CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::time::Duration;
use uuid::Uuid;

use crate::cli::context::open_context;
use crate::cli::output::{describe_cascade, list_table, output, truncate, CommandOutput};
use crate::domain::models::{ActionResult, ActivityEvent, Task};
use crate::services::{ActionRun, ActionRunStatus, AutomationOutcome, CascadeReport, TaskUpdate};

/// Arguments for `caseflow task`.
#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

/// Task subcommands.
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Mark a task completed
    Complete {
        /// Task ID
        id: Uuid,
        /// Acting user
        #[arg(long)]
        actor: Uuid,
    },
    /// Assign a task to a user, or clear the assignment
    Assign {
        /// Task ID
        id: Uuid,
        /// Assignee; omit to unassign
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Check (or uncheck) a checklist item
    Check {
        /// Checklist item ID
        item_id: Uuid,
        #[arg(long)]
        actor: Uuid,
        /// Uncheck instead of check
        #[arg(long)]
        uncheck: bool,
    },
    /// Complete a subtask
    Subtask {
        /// Subtask ID
        subtask_id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Evaluate the task's conditions and run its automation actions
    RunActions {
        /// Task ID
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Run the task's AI agent
    Automate {
        /// Task ID
        id: Uuid,
        #[arg(long)]
        actor: Uuid,
        /// Override the configured agent timeout
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show the activity recorded for a task
    History {
        /// Task ID
        id: Uuid,
    },
}

/// The fields of a task worth printing after a change.
#[derive(Debug, serde::Serialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub review_status: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub completed_by: Option<Uuid>,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_output: Option<serde_json::Value>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status.as_str().to_string(),
            review_status: task.review_status.map(|r| r.as_str().to_string()),
            assigned_to: task.assigned_to,
            completed_by: task.completed_by,
            version: task.version,
            automation_output: task.automation_output.clone(),
        }
    }
}

impl TaskSummary {
    /// Human-readable summary lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Task: {} ({})", self.title, self.id),
            format!("Status: {}", self.status),
        ];
        if let Some(review) = &self.review_status {
            lines.push(format!("Review: {review}"));
        }
        if let Some(user) = self.assigned_to {
            lines.push(format!("Assigned to: {user}"));
        }
        if let Some(output) = &self.automation_output {
            lines.push(format!("Output: {}", truncate(&output.to_string(), 200)));
        }
        lines
    }
}

/// Result of a task mutation.
#[derive(Debug, serde::Serialize)]
pub struct TaskChangeOutput {
    pub success: bool,
    pub message: String,
    pub task: TaskSummary,
    pub cascade: CascadeReport,
}

impl TaskChangeOutput {
    fn new(message: impl Into<String>, update: &TaskUpdate) -> Self {
        Self {
            success: true,
            message: message.into(),
            task: TaskSummary::from(&update.task),
            cascade: update.cascade.clone(),
        }
    }
}

impl CommandOutput for TaskChangeOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        lines.extend(self.task.lines());
        lines.extend(describe_cascade(&self.cascade));
        lines.join("\n")
    }
}

/// Result of running a task's actions.
#[derive(Debug, serde::Serialize)]
pub struct ActionRunOutput {
    pub status: ActionRunStatus,
    pub task: TaskSummary,
    pub results: Vec<ActionResult>,
    pub cascade: CascadeReport,
}

impl From<&ActionRun> for ActionRunOutput {
    fn from(run: &ActionRun) -> Self {
        Self {
            status: run.status,
            task: TaskSummary::from(&run.task),
            results: run.results.clone(),
            cascade: run.cascade.clone(),
        }
    }
}

impl CommandOutput for ActionRunOutput {
    fn to_human(&self) -> String {
        let headline = match self.status {
            ActionRunStatus::ConditionsNotMet => "Conditions not met; no actions ran.",
            ActionRunStatus::Completed => "All actions succeeded; task completed.",
            ActionRunStatus::NeedsFollowUp => "Some actions failed; task needs follow-up.",
        };
        let mut lines = vec![headline.to_string()];

        if !self.results.is_empty() {
            let mut table = list_table(&["#", "action", "result", "detail"]);
            for result in &self.results {
                let outcome = if result.skipped {
                    "skipped"
                } else if result.success {
                    "ok"
                } else {
                    "failed"
                };
                let detail = result
                    .error
                    .clone()
                    .or_else(|| result.output.as_ref().map(ToString::to_string))
                    .unwrap_or_default();
                table.add_row(vec![
                    result.index.to_string(),
                    result.action.clone(),
                    outcome.to_string(),
                    truncate(&detail, 60),
                ]);
            }
            lines.push(table.to_string());
        }
        lines.extend(describe_cascade(&self.cascade));
        lines.join("\n")
    }
}

/// Result of an agent run.
#[derive(Debug, serde::Serialize)]
pub struct AutomationOutput {
    #[serde(flatten)]
    pub outcome: AutomationOutcome,
}

impl CommandOutput for AutomationOutput {
    fn to_human(&self) -> String {
        let task = TaskSummary::from(self.outcome.task());
        let mut lines = match &self.outcome {
            AutomationOutcome::Completed { .. } => {
                vec!["Agent finished; task completed.".to_string()]
            }
            AutomationOutcome::AwaitingReview { .. } => {
                vec!["Agent finished; output awaits review.".to_string()]
            }
            AutomationOutcome::Failed { error, .. } => {
                vec![format!("Agent failed: {error}"), "Task reset to pending.".to_string()]
            }
        };
        lines.extend(task.lines());
        if let AutomationOutcome::Completed { cascade, .. } = &self.outcome {
            lines.extend(describe_cascade(cascade));
        }
        lines.join("\n")
    }
}

/// Activity recorded for a task.
#[derive(Debug, serde::Serialize)]
pub struct HistoryOutput {
    pub task_id: Uuid,
    pub events: Vec<ActivityEvent>,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.events.is_empty() {
            return format!("No activity recorded for task {}.", self.task_id);
        }
        let mut table = list_table(&["time", "event", "actor"]);
        for event in &self.events {
            table.add_row(vec![
                event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                event.kind_name().to_string(),
                event.actor_id.map_or_else(|| "system".to_string(), |a| a.to_string()),
            ]);
        }
        table.to_string()
    }
}

/// Run a task subcommand.
pub async fn execute(args: TaskArgs, json_mode: bool) -> Result<()> {
    let ctx = open_context().await?;
    let engine = &ctx.engine;

    match args.command {
        TaskCommands::Complete { id, actor } => {
            let update = engine.complete_task(id, actor).await?;
            output(&TaskChangeOutput::new("Task completed.", &update), json_mode);
        }
        TaskCommands::Assign { id, user } => {
            let task = engine.assign_task(id, user).await?;
            let message = match user {
                Some(user) => format!("Task assigned to {user}."),
                None => "Task unassigned.".to_string(),
            };
            let update = TaskUpdate {
                task,
                cascade: CascadeReport::default(),
            };
            output(&TaskChangeOutput::new(message, &update), json_mode);
        }
        TaskCommands::Check { item_id, actor, uncheck } => {
            let update = engine.toggle_checklist_item(item_id, actor, !uncheck).await?;
            let message = if uncheck {
                "Checklist item unchecked."
            } else {
                "Checklist item checked."
            };
            output(&TaskChangeOutput::new(message, &update), json_mode);
        }
        TaskCommands::Subtask { subtask_id, actor } => {
            let update = engine.complete_subtask(subtask_id, actor).await?;
            output(&TaskChangeOutput::new("Subtask completed.", &update), json_mode);
        }
        TaskCommands::RunActions { id, actor } => {
            let run = engine.run_task_actions(id, actor).await?;
            output(&ActionRunOutput::from(&run), json_mode);
        }
        TaskCommands::Automate { id, actor, timeout_secs } => {
            let outcome = match timeout_secs {
                Some(secs) => {
                    engine
                        .execute_task_automation_with_timeout(id, actor, Duration::from_secs(secs))
                        .await?
                }
                None => engine.execute_task_automation(id, actor).await?,
            };
            output(&AutomationOutput { outcome }, json_mode);
        }
        TaskCommands::History { id } => {
            let events = ctx.activity_log.list_for_task(id).await?;
            output(&HistoryOutput { task_id: id, events }, json_mode);
        }
    }

    Ok(())
}
