//! Activity events emitted after engine state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fire-and-forget record of something the engine did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub kind: ActivityKind,
}

impl ActivityEvent {
    /// Create an event stamped with the current time.
    pub fn new(actor_id: Option<Uuid>, kind: ActivityKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            kind,
        }
    }

    /// Short stable name of the event kind.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// What happened, with the ids it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    TaskCompleted { task_id: Uuid, step_id: Uuid, automatic: bool },
    TaskAssigned { task_id: Uuid, assignee: Option<Uuid> },
    SubtaskCompleted { subtask_id: Uuid, task_id: Uuid },
    ChecklistToggled { item_id: Uuid, task_id: Uuid, checked: bool },
    StepCompleted { step_id: Uuid, stage_id: Uuid },
    StageCompleted { stage_id: Uuid, workflow_id: Uuid },
    WorkflowCompleted { workflow_id: Uuid },
    AutomationStarted { task_id: Uuid, agent: String },
    AutomationFailed { task_id: Uuid, agent: String, error: String },
    ReviewRequested { task_id: Uuid },
    ReviewApproved { task_id: Uuid },
    ReviewRejected { task_id: Uuid, notes: String },
    ActionsExecuted { task_id: Uuid, total: usize, failed: usize, skipped: usize },
}

impl ActivityKind {
    /// Stable snake_case name used in logs and storage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskAssigned { .. } => "task_assigned",
            Self::SubtaskCompleted { .. } => "subtask_completed",
            Self::ChecklistToggled { .. } => "checklist_toggled",
            Self::StepCompleted { .. } => "step_completed",
            Self::StageCompleted { .. } => "stage_completed",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::AutomationStarted { .. } => "automation_started",
            Self::AutomationFailed { .. } => "automation_failed",
            Self::ReviewRequested { .. } => "review_requested",
            Self::ReviewApproved { .. } => "review_approved",
            Self::ReviewRejected { .. } => "review_rejected",
            Self::ActionsExecuted { .. } => "actions_executed",
        }
    }

    /// The task this event concerns, if any.
    pub fn task_id(&self) -> Option<Uuid> {
        match self {
            Self::TaskCompleted { task_id, .. }
            | Self::TaskAssigned { task_id, .. }
            | Self::SubtaskCompleted { task_id, .. }
            | Self::ChecklistToggled { task_id, .. }
            | Self::AutomationStarted { task_id, .. }
            | Self::AutomationFailed { task_id, .. }
            | Self::ReviewRequested { task_id }
            | Self::ReviewApproved { task_id }
            | Self::ReviewRejected { task_id, .. }
            | Self::ActionsExecuted { task_id, .. } => Some(*task_id),
            Self::StepCompleted { .. }
            | Self::StageCompleted { .. }
            | Self::WorkflowCompleted { .. } => None,
        }
    }
}
