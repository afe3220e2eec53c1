//! Workflow, Stage and Step domain models.
//!
//! A workflow is the root of the hierarchy Workflow → Stage → Step → Task.
//! Stages and steps carry an `auto_progress` flag that decides whether the
//! engine may complete them once every child is done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

impl WorkflowStatus {
    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Parse a storage name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "completed" | "complete" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Archived workflows are frozen; the engine never completes them.
    pub fn accepts_completion(&self) -> bool {
        matches!(self, Self::Draft | Self::Active)
    }
}

/// Status shared by stages and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

impl UnitStatus {
    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Parse a storage name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether the unit has been completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Root of a hierarchy, owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    pub is_automated: bool,
    /// Number of stages at assignment time. Informational only; completion
    /// is always derived from the stages themselves.
    pub total_stages: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// An active workflow.
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.into(),
            status: WorkflowStatus::Active,
            is_automated: false,
            total_stages: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Override the status.
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the workflow has been completed.
    pub fn is_completed(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// An ordered phase of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub name: String,
    pub order: i32,
    pub auto_progress: bool,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Stage {
    /// A pending required stage.
    pub fn new(workflow_id: Uuid, name: impl Into<String>, order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            name: name.into(),
            order,
            auto_progress: true,
            status: UnitStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Toggle automatic completion.
    pub fn with_auto_progress(mut self, auto_progress: bool) -> Self {
        self.auto_progress = auto_progress;
        self
    }
}

/// An ordered unit of a stage that groups tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub stage_id: Uuid,
    pub name: String,
    pub order: i32,
    pub auto_progress: bool,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Step {
    /// A pending required step.
    pub fn new(stage_id: Uuid, name: impl Into<String>, order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            stage_id,
            name: name.into(),
            order,
            auto_progress: true,
            status: UnitStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Toggle automatic completion.
    pub fn with_auto_progress(mut self, auto_progress: bool) -> Self {
        self.auto_progress = auto_progress;
        self
    }
}

/// Completion rollup for a workflow, used for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub stages_total: usize,
    pub stages_completed: usize,
    pub steps_total: usize,
    pub steps_completed: usize,
    pub tasks_total: usize,
    pub tasks_completed: usize,
}

impl ProgressSummary {
    /// Fraction of tasks completed, 0.0 for an empty workflow.
    pub fn task_ratio(&self) -> f64 {
        if self.tasks_total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let ratio = self.tasks_completed as f64 / self.tasks_total as f64;
            ratio
        }
    }
}
