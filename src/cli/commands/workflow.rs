//! Workflow CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::cli::context::open_context;
use crate::cli::output::{list_table, output, short_id, truncate, CommandOutput};
use crate::domain::models::{ProgressSummary, Workflow};
use crate::domain::ports::HierarchyStore;
use crate::infrastructure::templates::WorkflowLoader;

/// Arguments for `caseflow workflow`.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,
}

/// Workflow subcommands.
#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Create a workflow from a YAML template
    Import {
        /// Template file
        file: PathBuf,
        /// Owning organization
        #[arg(long)]
        org: Uuid,
    },
    /// Show a workflow with its stages, steps and tasks
    Show {
        /// Workflow ID
        id: Uuid,
    },
    /// List workflows
    List {
        /// Filter by organization
        #[arg(long)]
        org: Option<Uuid>,
    },
}

/// Result of importing a YAML template.
#[derive(Debug, serde::Serialize)]
pub struct ImportOutput {
    pub workflow_id: Uuid,
    pub name: String,
    pub stages: usize,
    pub steps: usize,
    pub tasks: usize,
}

impl CommandOutput for ImportOutput {
    fn to_human(&self) -> String {
        format!(
            "Imported workflow '{}' ({})\n  {} stage(s), {} step(s), {} task(s)",
            self.name, self.workflow_id, self.stages, self.steps, self.tasks
        )
    }
}

/// A task row in the workflow tree.
#[derive(Debug, serde::Serialize)]
pub struct TaskLine {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub review_status: Option<String>,
    pub agent: Option<String>,
}

/// A step and its tasks.
#[derive(Debug, serde::Serialize)]
pub struct StepLine {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub tasks: Vec<TaskLine>,
}

/// A stage and its steps.
#[derive(Debug, serde::Serialize)]
pub struct StageLine {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub steps: Vec<StepLine>,
}

/// A workflow with its full tree and progress.
#[derive(Debug, serde::Serialize)]
pub struct WorkflowDetailOutput {
    pub workflow: Workflow,
    pub progress: ProgressSummary,
    pub stages: Vec<StageLine>,
}

impl CommandOutput for WorkflowDetailOutput {
    fn to_human(&self) -> String {
        let p = &self.progress;
        let mut lines = vec![
            format!("Workflow: {} ({})", self.workflow.name, self.workflow.id),
            format!("Status: {}", self.workflow.status.as_str()),
            format!(
                "Progress: stages {}/{}, steps {}/{}, tasks {}/{} ({:.0}%)",
                p.stages_completed,
                p.stages_total,
                p.steps_completed,
                p.steps_total,
                p.tasks_completed,
                p.tasks_total,
                p.task_ratio() * 100.0
            ),
        ];

        for stage in &self.stages {
            lines.push(format!("\n[{}] {} ({})", stage.status, stage.name, short_id(stage.id)));
            for step in &stage.steps {
                lines.push(format!("  [{}] {} ({})", step.status, step.name, short_id(step.id)));
                for task in &step.tasks {
                    let mut line = format!("    [{}] {} ({})", task.status, task.title, task.id);
                    if let Some(review) = &task.review_status {
                        line.push_str(&format!(" review={review}"));
                    }
                    if let Some(agent) = &task.agent {
                        line.push_str(&format!(" agent={agent}"));
                    }
                    lines.push(line);
                }
            }
        }
        lines.join("\n")
    }
}

/// Workflows in an organization.
#[derive(Debug, serde::Serialize)]
pub struct WorkflowListOutput {
    pub workflows: Vec<Workflow>,
    pub total: usize,
}

impl CommandOutput for WorkflowListOutput {
    fn to_human(&self) -> String {
        if self.workflows.is_empty() {
            return "No workflows found.".to_string();
        }

        let mut table = list_table(&["id", "name", "status", "stages", "automated", "created"]);
        for wf in &self.workflows {
            table.add_row(vec![
                short_id(wf.id),
                truncate(&wf.name, 40),
                wf.status.as_str().to_string(),
                wf.total_stages.to_string(),
                if wf.is_automated { "yes" } else { "no" }.to_string(),
                wf.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        format!("{table}\n\nShowing {} workflow(s)", self.total)
    }
}

/// Run a workflow subcommand.
pub async fn execute(args: WorkflowArgs, json_mode: bool) -> Result<()> {
    let ctx = open_context().await?;

    match args.command {
        WorkflowCommands::Import { file, org } => {
            let template = WorkflowLoader::load_from_file(&file)?;
            let plan = WorkflowLoader::instantiate(&template, org)
                .with_context(|| format!("Invalid workflow template {}", file.display()))?;
            plan.persist(&ctx.store).await?;

            let out = ImportOutput {
                workflow_id: plan.workflow.id,
                name: plan.workflow.name.clone(),
                stages: plan.stages.len(),
                steps: plan.steps.len(),
                tasks: plan.tasks.len(),
            };
            output(&out, json_mode);
        }
        WorkflowCommands::Show { id } => {
            let progress = ctx.engine.progress_report(id).await?;

            let mut stages = Vec::new();
            for stage in ctx.store.list_stages(id).await? {
                let mut steps = Vec::new();
                for step in ctx.store.list_steps(stage.id).await? {
                    let tasks = ctx
                        .store
                        .list_tasks(step.id)
                        .await?
                        .into_iter()
                        .map(|t| TaskLine {
                            id: t.id,
                            title: t.title,
                            status: t.status.as_str().to_string(),
                            review_status: t.review_status.map(|r| r.as_str().to_string()),
                            agent: t.ai_agent_id,
                        })
                        .collect();
                    steps.push(StepLine {
                        id: step.id,
                        name: step.name,
                        status: step.status.as_str().to_string(),
                        tasks,
                    });
                }
                stages.push(StageLine {
                    id: stage.id,
                    name: stage.name,
                    status: stage.status.as_str().to_string(),
                    steps,
                });
            }

            let out = WorkflowDetailOutput {
                workflow: progress.workflow,
                progress: progress.summary,
                stages,
            };
            output(&out, json_mode);
        }
        WorkflowCommands::List { org } => {
            let workflows = ctx.store.list_workflows(org).await?;
            let out = WorkflowListOutput {
                total: workflows.len(),
                workflows,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}
