//! Workflow execution engine facade.
//!
//! Wires the task state machine, the auto-progression cascade, the
//! automation engine and the agent executor together and exposes the
//! operations the outer layers call. Every operation that can complete a
//! task runs the cascade afterwards.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    all_succeeded, ActionResult, ActivityEvent, ActivityKind, Config, ExecutionContext,
    ProgressSummary, ReviewStatus, Task, Workflow,
};
use crate::domain::ports::{
    ActivityLogger, AgentInstallations, AutomationGateway, HierarchyStore, LlmConfigProvider,
};
use crate::services::agent_executor::{AgentExecutor, AutomationOutcome, ReviewApproval};
use crate::services::agent_registry::AgentRegistry;
use crate::services::auto_progression::{AutoProgressionEngine, CascadeReport};
use crate::services::automation_engine::{evaluate_conditions, AutomationEngine};
use crate::services::event_bus::emit;
use crate::services::hierarchy::{
    load_lineage, modify_task, progress_summary, require_workflow, TaskLineage,
};
use crate::services::task_state_machine::TaskStateMachine;

/// Tunables taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub agent_timeout: Duration,
    pub max_actions: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            agent_timeout: Duration::from_secs(config.agents.timeout_secs),
            max_actions: config.automation.max_actions,
        }
    }
}

/// Collaborators the engine is built from.
pub struct EngineDependencies {
    pub store: Arc<dyn HierarchyStore>,
    pub activity: Arc<dyn ActivityLogger>,
    pub registry: Arc<AgentRegistry>,
    pub installations: Arc<dyn AgentInstallations>,
    pub llm_configs: Arc<dyn LlmConfigProvider>,
    pub gateway: Arc<dyn AutomationGateway>,
}

/// A task write followed by its cascade.
#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdate {
    pub task: Task,
    pub cascade: CascadeReport,
}

/// How a task's action run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRunStatus {
    /// The task-level conditions did not pass; nothing ran or changed.
    ConditionsNotMet,
    /// Every action succeeded or was skipped; the task is completed.
    Completed,
    /// At least one action failed; the task stays in progress.
    NeedsFollowUp,
}

/// Outcome of running a task's post-completion actions.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRun {
    pub status: ActionRunStatus,
    pub task: Task,
    pub results: Vec<ActionResult>,
    /// The payload as the last action left it.
    pub data: Map<String, Value>,
    pub cascade: CascadeReport,
}

/// A workflow with its completion counts.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowProgress {
    pub workflow: Workflow,
    pub summary: ProgressSummary,
}

/// Entry point for every workflow operation.
pub struct WorkflowEngine {
    store: Arc<dyn HierarchyStore>,
    activity: Arc<dyn ActivityLogger>,
    state_machine: Arc<TaskStateMachine>,
    progression: Arc<AutoProgressionEngine>,
    automation: AutomationEngine,
    agents: AgentExecutor,
}

impl WorkflowEngine {
    /// Wire the services from their ports.
    pub fn new(deps: EngineDependencies, settings: EngineSettings) -> Self {
        let state_machine = Arc::new(TaskStateMachine::new(
            deps.store.clone(),
            deps.activity.clone(),
        ));
        let progression = Arc::new(AutoProgressionEngine::new(
            deps.store.clone(),
            deps.activity.clone(),
        ));
        let automation = AutomationEngine::new(deps.gateway, settings.max_actions);
        let agents = AgentExecutor::new(
            deps.store.clone(),
            deps.registry,
            deps.installations,
            deps.llm_configs,
            state_machine.clone(),
            progression.clone(),
            deps.activity.clone(),
            settings.agent_timeout,
        );

        Self {
            store: deps.store,
            activity: deps.activity,
            state_machine,
            progression,
            automation,
            agents,
        }
    }

    /// The auto-progression engine.
    pub fn progression(&self) -> &AutoProgressionEngine {
        &self.progression
    }

    /// The automation engine.
    pub fn automation(&self) -> &AutomationEngine {
        &self.automation
    }

    /// Complete a task directly, whatever its sub-units, then cascade.
    pub async fn complete_task(&self, task_id: Uuid, actor_id: Uuid) -> DomainResult<TaskUpdate> {
        let completion = self.state_machine.complete_task(task_id, actor_id).await?;
        let cascade = self
            .progression
            .try_auto_progress_step(completion.task.step_id)
            .await;
        Ok(TaskUpdate {
            task: completion.task,
            cascade,
        })
    }

    /// Assign or unassign a task.
    pub async fn assign_task(&self, task_id: Uuid, user_id: Option<Uuid>) -> DomainResult<Task> {
        self.state_machine.assign_task(task_id, user_id).await
    }

    /// Check or uncheck a checklist item, then try to complete its task.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_checklist_item(
        &self,
        item_id: Uuid,
        actor_id: Uuid,
        checked: bool,
    ) -> DomainResult<TaskUpdate> {
        let mut item = self
            .store
            .get_checklist_item(item_id)
            .await?
            .ok_or_else(|| DomainError::checklist_item_not_found(item_id))?;

        if item.is_checked != checked {
            item.is_checked = checked;
            if checked {
                item.checked_by = Some(actor_id);
                item.checked_at = Some(chrono::Utc::now());
            } else {
                item.checked_by = None;
                item.checked_at = None;
            }
            self.store.update_checklist_item(&item).await?;
            tracing::info!(
                item_id = %item_id,
                task_id = %item.task_id,
                checked,
                "Checklist item toggled"
            );
            emit(
                self.activity.as_ref(),
                ActivityEvent::new(
                    Some(actor_id),
                    ActivityKind::ChecklistToggled {
                        item_id,
                        task_id: item.task_id,
                        checked,
                    },
                ),
            )
            .await;
        }

        self.progress_after_unit_change(item.task_id).await
    }

    /// Mark a subtask done, then try to complete its task.
    #[tracing::instrument(skip(self))]
    pub async fn complete_subtask(
        &self,
        subtask_id: Uuid,
        actor_id: Uuid,
    ) -> DomainResult<TaskUpdate> {
        let mut subtask = self
            .store
            .get_subtask(subtask_id)
            .await?
            .ok_or_else(|| DomainError::subtask_not_found(subtask_id))?;

        if !subtask.completed {
            subtask.completed = true;
            subtask.completed_by = Some(actor_id);
            subtask.completed_at = Some(chrono::Utc::now());
            self.store.update_subtask(&subtask).await?;
            tracing::info!(
                subtask_id = %subtask_id,
                task_id = %subtask.task_id,
                "Subtask completed"
            );
            emit(
                self.activity.as_ref(),
                ActivityEvent::new(
                    Some(actor_id),
                    ActivityKind::SubtaskCompleted {
                        subtask_id,
                        task_id: subtask.task_id,
                    },
                ),
            )
            .await;
        }

        self.progress_after_unit_change(subtask.task_id).await
    }

    async fn progress_after_unit_change(&self, task_id: Uuid) -> DomainResult<TaskUpdate> {
        let cascade = self.progression.try_auto_progress_task(task_id).await;
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::task_not_found(task_id))?;
        Ok(TaskUpdate { task, cascade })
    }

    /// Run the task's agent with the default timeout.
    pub async fn execute_task_automation(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
    ) -> DomainResult<AutomationOutcome> {
        self.agents.execute_task_automation(task_id, actor_id).await
    }

    /// Run the task's agent with an explicit timeout.
    pub async fn execute_task_automation_with_timeout(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        timeout: Duration,
    ) -> DomainResult<AutomationOutcome> {
        self.agents
            .execute_task_automation_with_timeout(task_id, actor_id, timeout)
            .await
    }

    /// Accept agent output that is waiting for review.
    pub async fn approve_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> DomainResult<ReviewApproval> {
        self.agents.approve_review(task_id, reviewer_id, notes).await
    }

    /// Reject agent output that is waiting for review.
    pub async fn reject_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        notes: String,
    ) -> DomainResult<Task> {
        self.agents.reject_review(task_id, reviewer_id, notes).await
    }

    /// Run a task's automation actions.
    ///
    /// The task-level conditions gate the whole run. When they pass, the
    /// task moves to `in_progress`, every action runs, and the task is
    /// completed (and cascaded) only if no action failed. An automated task
    /// must have accepted agent output first; one waiting for review is
    /// rejected without any change.
    #[tracing::instrument(skip(self))]
    pub async fn run_task_actions(&self, task_id: Uuid, actor_id: Uuid) -> DomainResult<ActionRun> {
        let lineage = load_lineage(self.store.as_ref(), task_id).await?;
        if lineage.task.is_completed() {
            return Err(DomainError::InvalidState(format!(
                "Task {task_id} is already completed"
            )));
        }
        if lineage.task.review_status == Some(ReviewStatus::PendingReview) {
            return Err(DomainError::InvalidState(format!(
                "Task {task_id} is waiting for review"
            )));
        }
        if !lineage.task.ai_gate_satisfied() {
            return Err(DomainError::InvalidState(format!(
                "Task {task_id} has no accepted agent output"
            )));
        }
        let max_actions = self.automation.max_actions();
        if lineage.task.automation_actions.len() > max_actions {
            return Err(DomainError::Validation(format!(
                "Task {task_id} has {} actions, more than the limit of {max_actions}",
                lineage.task.automation_actions.len()
            )));
        }

        let mut context = execution_context(&lineage, actor_id);
        if !evaluate_conditions(&lineage.task.automation_conditions, &context) {
            tracing::info!(task_id = %task_id, "Task conditions not met, actions not run");
            return Ok(ActionRun {
                status: ActionRunStatus::ConditionsNotMet,
                task: lineage.task,
                results: Vec::new(),
                data: context.data,
                cascade: CascadeReport::default(),
            });
        }

        let (running, _) = modify_task(self.store.as_ref(), task_id, |t| {
            t.begin_run()?;
            Ok(true)
        })
        .await?;

        let results = self
            .automation
            .execute_actions(&running.automation_actions, &mut context)
            .await?;

        let failed = results.iter().filter(|r| !r.success).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                Some(actor_id),
                ActivityKind::ActionsExecuted {
                    task_id,
                    total: results.len(),
                    failed,
                    skipped,
                },
            ),
        )
        .await;

        if !all_succeeded(&results) {
            tracing::info!(task_id = %task_id, failed, "Actions failed, task left in progress");
            let task = self
                .store
                .get_task(task_id)
                .await?
                .ok_or_else(|| DomainError::task_not_found(task_id))?;
            return Ok(ActionRun {
                status: ActionRunStatus::NeedsFollowUp,
                task,
                results,
                data: context.data,
                cascade: CascadeReport::default(),
            });
        }

        let completion = self.state_machine.complete_task(task_id, actor_id).await?;
        let cascade = self
            .progression
            .try_auto_progress_step(completion.task.step_id)
            .await;
        Ok(ActionRun {
            status: ActionRunStatus::Completed,
            task: completion.task,
            results,
            data: context.data,
            cascade,
        })
    }

    /// Completion counts for a workflow.
    pub async fn progress_report(&self, workflow_id: Uuid) -> DomainResult<WorkflowProgress> {
        let workflow = require_workflow(self.store.as_ref(), workflow_id).await?;
        let summary = progress_summary(self.store.as_ref(), workflow_id).await?;
        Ok(WorkflowProgress { workflow, summary })
    }
}

/// Build the context for an action run: the task's input merged with its
/// output (output wins on key clashes).
pub fn execution_context(lineage: &TaskLineage, actor_id: Uuid) -> ExecutionContext {
    let mut data = Map::new();
    for source in [&lineage.task.automation_input, &lineage.task.automation_output] {
        if let Some(Value::Object(map)) = source {
            data.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    ExecutionContext {
        task_id: lineage.task.id,
        step_id: lineage.step.id,
        stage_id: lineage.stage.id,
        workflow_id: lineage.workflow.id,
        organization_id: lineage.workflow.organization_id,
        actor_id,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Stage, Step};
    use serde_json::json;

    #[test]
    fn test_execution_context_merges_input_and_output() {
        let workflow = Workflow::new(Uuid::new_v4(), "Tax return");
        let stage = Stage::new(workflow.id, "Intake", 0);
        let step = Step::new(stage.id, "Collect", 0);
        let mut task =
            Task::automated(step.id, "Extract", "document-extractor", json!({"a": 1, "b": 1}));
        task.automation_output = Some(json!({"b": 2, "c": 3}));

        let lineage = TaskLineage {
            task,
            step,
            stage,
            workflow,
        };
        let actor = Uuid::new_v4();
        let ctx = execution_context(&lineage, actor);

        assert_eq!(ctx.data.get("a"), Some(&json!(1)));
        assert_eq!(ctx.data.get("b"), Some(&json!(2)));
        assert_eq!(ctx.data.get("c"), Some(&json!(3)));
        assert_eq!(ctx.actor_id, actor);
        assert_eq!(ctx.organization_id, lineage.workflow.organization_id);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.agents.timeout_secs = 7;
        config.automation.max_actions = 3;
        let settings = EngineSettings::from(&config);
        assert_eq!(settings.agent_timeout, Duration::from_secs(7));
        assert_eq!(settings.max_actions, 3);
    }
}
