//! Domain errors for the caseflow workflow engine.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the workflow engine.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing or malformed input, rejected before any state mutation.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Agent '{agent}' is not installed or enabled for organization {organization_id}")]
    NotInstalled { agent: String, organization_id: Uuid },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The agent call itself failed (network, provider, malformed response).
    #[error("Agent adapter error: {0}")]
    Adapter(String),

    #[error("Agent call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: &'static str, id: Uuid },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result alias used across the domain and services.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// A missing workflow.
    pub fn workflow_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Workflow", id }
    }

    /// A missing stage.
    pub fn stage_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Stage", id }
    }

    /// A missing step.
    pub fn step_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Step", id }
    }

    /// A missing task.
    pub fn task_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Task", id }
    }

    /// A missing subtask.
    pub fn subtask_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Subtask", id }
    }

    /// A missing checklist item.
    pub fn checklist_item_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "ChecklistItem", id }
    }

    /// Whether this error came from the agent call and should be recorded on
    /// the task instead of being surfaced as a hard failure.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(self, Self::Adapter(_) | Self::Timeout(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
