//! Task domain model.
//!
//! Tasks are the leaves of the workflow hierarchy that carry work. A task has
//! two independent lifecycles: `status` (pending → in_progress → completed)
//! and, for AI-produced output, the review gate
//! (none → pending_review → approved | rejected).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::automation::{AutomationAction, Condition};
use crate::domain::errors::{DomainError, DomainResult};

/// Whether a task is worked by a human or delegated to an AI agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Manual,
    Automated,
}

impl TaskType {
    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automated => "automated",
        }
    }

    /// Parse a storage name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "automated" => Some(Self::Automated),
            _ => None,
        }
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parse a storage name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "in_progress" | "in-progress" => Some(Self::InProgress),
            "completed" | "complete" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Completed and cancelled tasks accept no further changes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Valid transitions from this status.
    ///
    /// `InProgress → Pending` is only taken by a failed agent run or a
    /// rejected review.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::InProgress, Self::Completed],
            Self::InProgress => vec![Self::Completed, Self::Pending],
            Self::Completed => vec![],
        }
    }

    /// Whether `new_status` is reachable in one step.
    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review-gate state for AI-produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    PendingReview,
    Approved,
    Rejected,
}

impl ReviewStatus {
    /// Storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a storage name.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Whether the review gate may move from `from` to `to`.
///
/// A rejected review re-enters `PendingReview` when the agent is re-run.
pub fn review_transition_allowed(from: Option<ReviewStatus>, to: ReviewStatus) -> bool {
    matches!(
        (from, to),
        (None | Some(ReviewStatus::Rejected), ReviewStatus::PendingReview)
            | (
                Some(ReviewStatus::PendingReview),
                ReviewStatus::Approved | ReviewStatus::Rejected
            )
    )
}

/// A unit of work under a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub step_id: Uuid,
    pub title: String,
    pub description: String,
    pub order: i32,
    pub task_type: TaskType,
    pub status: TaskStatus,

    /// Slug of the agent that works an automated task.
    pub ai_agent_id: Option<String>,
    /// Name of the organization LLM configuration to use instead of the default.
    pub llm_config: Option<String>,
    pub automation_input: Option<Value>,
    pub automation_output: Option<Value>,
    /// Gate evaluated before the task's actions run.
    #[serde(default)]
    pub automation_conditions: Vec<Condition>,
    #[serde(default)]
    pub automation_actions: Vec<AutomationAction>,

    pub review_required: bool,
    pub review_status: Option<ReviewStatus>,
    pub reviewed_by: Option<Uuid>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,

    pub assigned_to: Option<Uuid>,
    pub completed_by: Option<Uuid>,

    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// A pending manual task.
    pub fn new(step_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step_id,
            title: title.into(),
            description: String::new(),
            order: 0,
            task_type: TaskType::Manual,
            status: TaskStatus::Pending,
            ai_agent_id: None,
            llm_config: None,
            automation_input: None,
            automation_output: None,
            automation_conditions: Vec::new(),
            automation_actions: Vec::new(),
            review_required: false,
            review_status: None,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
            assigned_to: None,
            completed_by: None,
            version: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Build an automated task delegated to `agent`.
    pub fn automated(
        step_id: Uuid,
        title: impl Into<String>,
        agent: impl Into<String>,
        input: Value,
    ) -> Self {
        let mut task = Self::new(step_id, title);
        task.task_type = TaskType::Automated;
        task.ai_agent_id = Some(agent.into());
        task.automation_input = Some(input);
        task
    }

    /// Set the order within the step.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Require human review of agent output.
    pub fn with_review_required(mut self, review_required: bool) -> Self {
        self.review_required = review_required;
        self
    }

    /// Attach post-completion actions.
    pub fn with_actions(mut self, actions: Vec<AutomationAction>) -> Self {
        self.automation_actions = actions;
        self
    }

    /// Gate the actions on `conditions`.
    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.automation_conditions = conditions;
        self
    }

    /// Whether the task has been completed.
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Whether the status change is allowed.
    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, stamping timestamps.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> DomainResult<()> {
        if !self.can_transition_to(new_status) {
            return Err(DomainError::InvalidState(format!(
                "Cannot transition task {} from {} to {}",
                self.id, self.status, new_status
            )));
        }

        let now = Utc::now();
        self.status = new_status;
        self.updated_at = now;

        match new_status {
            TaskStatus::InProgress => self.started_at = Some(now),
            TaskStatus::Completed => self.completed_at = Some(now),
            TaskStatus::Pending => {
                self.started_at = None;
                self.completed_at = None;
            }
        }

        Ok(())
    }

    /// Mark the task completed by `actor`. Returns `false` when it already was.
    pub fn mark_completed(&mut self, actor: Option<Uuid>) -> DomainResult<bool> {
        if self.is_completed() {
            return Ok(false);
        }
        self.transition_to(TaskStatus::Completed)?;
        self.completed_by = actor;
        Ok(true)
    }

    /// Move to `InProgress` for an agent or action run. Re-entering from
    /// `InProgress` is allowed so an interrupted run can be retried.
    pub fn begin_run(&mut self) -> DomainResult<()> {
        match self.status {
            TaskStatus::InProgress => {
                self.started_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => self.transition_to(TaskStatus::InProgress),
        }
    }

    /// Return an in-progress task to `Pending`, replacing its output.
    pub fn reset_to_pending(&mut self, output: Option<Value>) -> DomainResult<()> {
        if self.status != TaskStatus::Pending {
            self.transition_to(TaskStatus::Pending)?;
        }
        self.automation_output = output;
        Ok(())
    }

    fn set_review_status(&mut self, to: ReviewStatus) -> DomainResult<()> {
        if !review_transition_allowed(self.review_status, to) {
            return Err(DomainError::InvalidState(format!(
                "Cannot move review of task {} from {} to {}",
                self.id,
                self.review_status.map_or("none", |s| s.as_str()),
                to.as_str()
            )));
        }
        self.review_status = Some(to);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Park agent output for a human decision.
    pub fn request_review(&mut self) -> DomainResult<()> {
        if !self.review_required {
            return Err(DomainError::InvalidState(format!(
                "Task {} does not require review",
                self.id
            )));
        }
        self.set_review_status(ReviewStatus::PendingReview)
    }

    /// Approve the pending output and complete the task.
    pub fn approve(&mut self, reviewer: Uuid, notes: Option<String>) -> DomainResult<()> {
        self.set_review_status(ReviewStatus::Approved)?;
        self.reviewed_by = Some(reviewer);
        self.review_notes = notes.filter(|n| !n.trim().is_empty());
        self.reviewed_at = Some(Utc::now());
        self.mark_completed(Some(reviewer))?;
        Ok(())
    }

    /// Reject the pending output: back to `Pending` with the output cleared.
    pub fn reject(&mut self, reviewer: Uuid, notes: String) -> DomainResult<()> {
        if notes.trim().is_empty() {
            return Err(DomainError::Validation(
                "Rejecting a review requires notes".to_string(),
            ));
        }
        if self.is_completed() {
            return Err(DomainError::InvalidState(format!(
                "Task {} is already completed",
                self.id
            )));
        }
        self.set_review_status(ReviewStatus::Rejected)?;
        self.reviewed_by = Some(reviewer);
        self.review_notes = Some(notes);
        self.reviewed_at = Some(Utc::now());
        self.reset_to_pending(None)
    }

    /// Check the automated-task invariant: an agent and a non-empty input.
    pub fn validate_automation(&self) -> DomainResult<()> {
        let agent_missing = self
            .ai_agent_id
            .as_deref()
            .is_none_or(|a| a.trim().is_empty());
        if agent_missing {
            return Err(DomainError::Validation(format!(
                "Automated task {} has no AI agent",
                self.id
            )));
        }
        if self.automation_input.as_ref().is_none_or(is_blank_value) {
            return Err(DomainError::Validation(format!(
                "Automated task {} has no automation input",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether the output was recorded by a failed agent run.
    pub fn has_automation_error(&self) -> bool {
        self.automation_output
            .as_ref()
            .and_then(|v| v.get("error"))
            .is_some()
    }

    /// The AI part of complete-eligibility: manual tasks always pass;
    /// automated tasks need approved output, or any successful output when
    /// review is not required.
    pub fn ai_gate_satisfied(&self) -> bool {
        match self.task_type {
            TaskType::Manual => true,
            TaskType::Automated if self.review_required => {
                self.review_status == Some(ReviewStatus::Approved)
            }
            TaskType::Automated => {
                self.automation_output.as_ref().is_some_and(|v| !is_blank_value(v))
                    && !self.has_automation_error()
            }
        }
    }
}

/// A sub-unit of a task that is ticked off as done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    /// Optional subtasks never block completion of the parent task.
    pub required: bool,
    pub completed: bool,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Subtask {
    /// An incomplete required subtask.
    pub fn new(task_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            title: title.into(),
            required: true,
            completed: false,
            completed_by: None,
            completed_at: None,
        }
    }

    /// Complete, or not required.
    pub fn is_satisfied(&self) -> bool {
        self.completed || !self.required
    }
}

/// A checklist entry attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub label: String,
    pub required: bool,
    pub is_checked: bool,
    pub checked_by: Option<Uuid>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl ChecklistItem {
    /// An unchecked required item.
    pub fn new(task_id: Uuid, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            label: label.into(),
            required: true,
            is_checked: false,
            checked_by: None,
            checked_at: None,
        }
    }

    /// Checked, or not required.
    pub fn is_satisfied(&self) -> bool {
        self.is_checked || !self.required
    }
}

/// Null, blank strings, and empty arrays/objects count as "no value".
pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
