//! Hierarchy store port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ChecklistItem, Stage, Step, Subtask, Task, Workflow};

/// Read/write access to the workflow hierarchy.
///
/// List operations return children ordered by `order`, then by id.
/// The `complete_*` operations are single atomic conditional writes: each
/// returns `true` only for the call that actually flipped the node to
/// completed, so concurrent cascades never double-complete a parent.
#[async_trait]
pub trait HierarchyStore: Send + Sync {
    async fn get_workflow(&self, id: Uuid) -> DomainResult<Option<Workflow>>;

    async fn get_stage(&self, id: Uuid) -> DomainResult<Option<Stage>>;

    async fn get_step(&self, id: Uuid) -> DomainResult<Option<Step>>;

    async fn get_task(&self, id: Uuid) -> DomainResult<Option<Task>>;

    async fn get_subtask(&self, id: Uuid) -> DomainResult<Option<Subtask>>;

    async fn get_checklist_item(&self, id: Uuid) -> DomainResult<Option<ChecklistItem>>;

    async fn list_stages(&self, workflow_id: Uuid) -> DomainResult<Vec<Stage>>;

    async fn list_steps(&self, stage_id: Uuid) -> DomainResult<Vec<Step>>;

    async fn list_tasks(&self, step_id: Uuid) -> DomainResult<Vec<Task>>;

    async fn list_subtasks(&self, task_id: Uuid) -> DomainResult<Vec<Subtask>>;

    async fn list_checklist_items(&self, task_id: Uuid) -> DomainResult<Vec<ChecklistItem>>;

    /// Persist a task if its `version` still matches the stored one.
    ///
    /// On success the stored version is bumped and written back into `task`.
    /// A stale version fails with `ConcurrencyConflict`.
    async fn update_task(&self, task: &mut Task) -> DomainResult<()>;

    async fn update_subtask(&self, subtask: &Subtask) -> DomainResult<()>;

    async fn update_checklist_item(&self, item: &ChecklistItem) -> DomainResult<()>;

    /// Complete `task` if it is still at `task.version`, not completed, has
    /// at least one subtask or checklist item, and every required one is done.
    async fn complete_task_if_units_satisfied(&self, task: &Task) -> DomainResult<bool>;

    /// Complete a step whose `auto_progress` is set and whose tasks are all completed.
    async fn complete_step_if_ready(&self, step_id: Uuid) -> DomainResult<bool>;

    /// Complete a stage whose `auto_progress` is set and whose steps are all completed.
    async fn complete_stage_if_ready(&self, stage_id: Uuid) -> DomainResult<bool>;

    /// Complete a draft or active workflow whose stages are all completed.
    async fn complete_workflow_if_ready(&self, workflow_id: Uuid) -> DomainResult<bool>;
}
