//! Side effects available to automation actions.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// A task to create under an existing step.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub step_id: Uuid,
    pub title: String,
    pub description: String,
    pub assigned_to: Option<Uuid>,
}

/// A notification to deliver to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub title: String,
    pub body: String,
}

/// An outgoing message for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub organization_id: Uuid,
    pub task_id: Option<Uuid>,
    pub recipient: String,
    pub channel: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Entity writes performed by automation actions.
#[async_trait]
pub trait AutomationGateway: Send + Sync {
    /// Returns the id of the created task.
    async fn create_task(&self, task: NewTask) -> DomainResult<Uuid>;

    /// Apply a field map to a task. Unknown fields are a validation error.
    async fn update_task_fields(
        &self,
        task_id: Uuid,
        fields: &Map<String, Value>,
    ) -> DomainResult<()>;

    async fn create_notification(&self, notification: NewNotification) -> DomainResult<Uuid>;

    /// Queue a message for delivery; returns the message id.
    async fn send_message(&self, message: OutgoingMessage) -> DomainResult<Uuid>;
}
