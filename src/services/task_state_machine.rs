//! Per-task lifecycle operations that do not cascade.
//!
//! Callers that want the upward cascade run the auto-progression engine
//! after a successful completion.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActivityEvent, ActivityKind, Task};
use crate::domain::ports::{ActivityLogger, HierarchyStore};
use crate::services::event_bus::emit;
use crate::services::hierarchy::modify_task;

/// Outcome of `complete_task`.
#[derive(Debug, Clone)]
pub struct Completion {
    pub task: Task,
    /// False when the task was already completed and nothing was written.
    pub changed: bool,
}

/// Validates and applies task status changes.
pub struct TaskStateMachine {
    store: Arc<dyn HierarchyStore>,
    activity: Arc<dyn ActivityLogger>,
}

impl TaskStateMachine {
    /// Create a state machine over the hierarchy store.
    pub fn new(store: Arc<dyn HierarchyStore>, activity: Arc<dyn ActivityLogger>) -> Self {
        Self { store, activity }
    }

    /// Mark a task completed by `actor_id`, regardless of its sub-units.
    ///
    /// Completing an already completed task is a no-op and keeps the
    /// original completer.
    #[tracing::instrument(skip(self))]
    pub async fn complete_task(&self, task_id: Uuid, actor_id: Uuid) -> DomainResult<Completion> {
        let (task, changed) = modify_task(self.store.as_ref(), task_id, |task| {
            task.mark_completed(Some(actor_id))
        })
        .await?;

        if changed {
            tracing::info!(task_id = %task_id, actor_id = %actor_id, "Task completed");
            emit(
                self.activity.as_ref(),
                ActivityEvent::new(
                    Some(actor_id),
                    ActivityKind::TaskCompleted {
                        task_id,
                        step_id: task.step_id,
                        automatic: false,
                    },
                ),
            )
            .await;
        }

        Ok(Completion { task, changed })
    }

    /// Reassign a task. `None` unassigns it. Status is untouched.
    #[tracing::instrument(skip(self))]
    pub async fn assign_task(&self, task_id: Uuid, user_id: Option<Uuid>) -> DomainResult<Task> {
        let (task, changed) = modify_task(self.store.as_ref(), task_id, |task| {
            if task.assigned_to == user_id {
                return Ok(false);
            }
            task.assigned_to = user_id;
            task.updated_at = chrono::Utc::now();
            Ok(true)
        })
        .await?;

        if changed {
            tracing::info!(task_id = %task_id, assignee = ?user_id, "Task assigned");
            emit(
                self.activity.as_ref(),
                ActivityEvent::new(
                    None,
                    ActivityKind::TaskAssigned {
                        task_id,
                        assignee: user_id,
                    },
                ),
            )
            .await;
        }

        Ok(task)
    }
}
