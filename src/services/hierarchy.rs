//! Shared hierarchy navigation helpers.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ProgressSummary, Stage, Step, Task, Workflow};
use crate::domain::ports::HierarchyStore;

/// A task together with every ancestor up to its workflow.
#[derive(Debug, Clone, Serialize)]
pub struct TaskLineage {
    pub task: Task,
    pub step: Step,
    pub stage: Stage,
    pub workflow: Workflow,
}

impl TaskLineage {
    /// Organization that owns the workflow.
    pub fn organization_id(&self) -> Uuid {
        self.workflow.organization_id
    }
}

/// Load a task or fail with `NotFound`.
pub async fn require_task(store: &dyn HierarchyStore, id: Uuid) -> DomainResult<Task> {
    store
        .get_task(id)
        .await?
        .ok_or_else(|| DomainError::task_not_found(id))
}

/// Load a step or fail with `NotFound`.
pub async fn require_step(store: &dyn HierarchyStore, id: Uuid) -> DomainResult<Step> {
    store
        .get_step(id)
        .await?
        .ok_or_else(|| DomainError::step_not_found(id))
}

/// Load a stage or fail with `NotFound`.
pub async fn require_stage(store: &dyn HierarchyStore, id: Uuid) -> DomainResult<Stage> {
    store
        .get_stage(id)
        .await?
        .ok_or_else(|| DomainError::stage_not_found(id))
}

/// Load a workflow or fail with `NotFound`.
pub async fn require_workflow(store: &dyn HierarchyStore, id: Uuid) -> DomainResult<Workflow> {
    store
        .get_workflow(id)
        .await?
        .ok_or_else(|| DomainError::workflow_not_found(id))
}

/// Walk parent pointers from a task to its workflow.
///
/// A dangling parent pointer is reported as `NotFound` for the missing node.
pub async fn load_lineage(store: &dyn HierarchyStore, task_id: Uuid) -> DomainResult<TaskLineage> {
    let task = require_task(store, task_id).await?;
    let step = require_step(store, task.step_id).await?;
    let stage = require_stage(store, step.stage_id).await?;
    let workflow = require_workflow(store, stage.workflow_id).await?;
    Ok(TaskLineage {
        task,
        step,
        stage,
        workflow,
    })
}

/// Count completed nodes at every level of a workflow.
pub async fn progress_summary(
    store: &dyn HierarchyStore,
    workflow_id: Uuid,
) -> DomainResult<ProgressSummary> {
    let mut summary = ProgressSummary::default();

    for stage in store.list_stages(workflow_id).await? {
        summary.stages_total += 1;
        if stage.status.is_completed() {
            summary.stages_completed += 1;
        }
        for step in store.list_steps(stage.id).await? {
            summary.steps_total += 1;
            if step.status.is_completed() {
                summary.steps_completed += 1;
            }
            let tasks = store.list_tasks(step.id).await?;
            summary.tasks_total += tasks.len();
            summary.tasks_completed += tasks.iter().filter(|t| t.is_completed()).count();
        }
    }

    Ok(summary)
}

/// Attempts made when a task write loses an optimistic-concurrency race.
pub(crate) const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Load a task, apply `change`, and persist it under optimistic concurrency.
///
/// `change` returns whether anything needs writing; returning `false` skips
/// the write. On a version conflict the task is reloaded and `change`
/// re-applied, up to [`MAX_WRITE_ATTEMPTS`] times. Returns the final task
/// and whether it was written.
pub async fn modify_task<F>(
    store: &dyn HierarchyStore,
    task_id: Uuid,
    mut change: F,
) -> DomainResult<(Task, bool)>
where
    F: FnMut(&mut Task) -> DomainResult<bool> + Send,
{
    let mut attempt = 1;
    loop {
        let mut task = require_task(store, task_id).await?;
        if !change(&mut task)? {
            return Ok((task, false));
        }
        match store.update_task(&mut task).await {
            Ok(()) => return Ok((task, true)),
            Err(DomainError::ConcurrencyConflict { .. }) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::debug!(
                    task_id = %task_id,
                    attempt,
                    "Task changed underneath, retrying write"
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
