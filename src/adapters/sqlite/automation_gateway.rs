//! SQLite-backed side effects for automation actions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_optional_uuid, parse_uuid, SqliteHierarchyStore};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Task;
use crate::domain::ports::{
    AutomationGateway, HierarchyStore, NewNotification, NewTask, OutgoingMessage,
};

/// Task fields an `update_task` action may write. Lifecycle fields such as
/// `status` only move through the state machine.
const UPDATABLE_TASK_FIELDS: &[&str] =
    &["title", "description", "assigned_to", "order", "automation_input"];

/// Automation side effects persisted to SQLite.
#[derive(Clone)]
pub struct SqliteAutomationGateway {
    pool: SqlitePool,
    store: SqliteHierarchyStore,
}

impl SqliteAutomationGateway {
    /// Create a gateway over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            store: SqliteHierarchyStore::new(pool.clone()),
            pool,
        }
    }

    /// Notifications queued for a user, oldest first.
    pub async fn list_notifications(&self, user_id: Uuid) -> DomainResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> =
            sqlx::query_as(
                "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at, rowid",
            )
                .bind(user_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Outgoing messages queued for a task, oldest first.
    pub async fn list_messages(&self, task_id: Uuid) -> DomainResult<Vec<QueuedMessage>> {
        let rows: Vec<MessageRow> =
            sqlx::query_as("SELECT * FROM messages WHERE task_id = ? ORDER BY created_at, rowid")
                .bind(task_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

fn apply_field(task: &mut Task, field: &str, value: &Value) -> DomainResult<()> {
    let invalid = |expected: &str| {
        DomainError::Validation(format!("Field '{field}' expects {expected}, got {value}"))
    };

    match field {
        "title" => {
            let title = value.as_str().map(str::trim).filter(|t| !t.is_empty());
            task.title = title.ok_or_else(|| invalid("a non-empty string"))?.to_string();
        }
        "description" => {
            task.description = value.as_str().ok_or_else(|| invalid("a string"))?.to_string();
        }
        "assigned_to" => {
            task.assigned_to = match value {
                Value::Null => None,
                Value::String(s) => Some(Uuid::parse_str(s).map_err(|_| invalid("a UUID"))?),
                _ => return Err(invalid("a UUID or null")),
            };
        }
        "order" => {
            let order = value
                .as_i64()
                .and_then(|o| i32::try_from(o).ok())
                .ok_or_else(|| invalid("an integer"))?;
            task.order = order;
        }
        "automation_input" => {
            task.automation_input = Some(value.clone());
        }
        other => {
            return Err(DomainError::Validation(format!(
                "Field '{other}' cannot be updated by an action (allowed: {})",
                UPDATABLE_TASK_FIELDS.join(", ")
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl AutomationGateway for SqliteAutomationGateway {
    async fn create_task(&self, new_task: NewTask) -> DomainResult<Uuid> {
        if self.store.get_step(new_task.step_id).await?.is_none() {
            return Err(DomainError::step_not_found(new_task.step_id));
        }

        let existing = self.store.list_tasks(new_task.step_id).await?;
        let next_order = existing.iter().map(|t| t.order).max().map_or(0, |o| o + 1);

        let mut task = Task::new(new_task.step_id, new_task.title).with_order(next_order);
        task.description = new_task.description;
        task.assigned_to = new_task.assigned_to;
        self.store.insert_task(&task).await?;

        tracing::info!(task_id = %task.id, step_id = %task.step_id, "Automation created task");
        Ok(task.id)
    }

    async fn update_task_fields(
        &self,
        task_id: Uuid,
        fields: &Map<String, Value>,
    ) -> DomainResult<()> {
        if fields.is_empty() {
            return Err(DomainError::Validation("update_task needs at least one field".to_string()));
        }

        let mut task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::task_not_found(task_id))?;

        for (field, value) in fields {
            apply_field(&mut task, field, value)?;
        }
        task.updated_at = Utc::now();
        self.store.update_task(&mut task).await
    }

    async fn create_notification(&self, notification: NewNotification) -> DomainResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO notifications (id, organization_id, user_id, task_id, title, body,
               created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(notification.organization_id.to_string())
        .bind(notification.user_id.to_string())
        .bind(notification.task_id.map(|t| t.to_string()))
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn send_message(&self, message: OutgoingMessage) -> DomainResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO messages (id, organization_id, task_id, recipient, channel, subject,
               body, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id.to_string())
        .bind(message.organization_id.to_string())
        .bind(message.task_id.map(|t| t.to_string()))
        .bind(&message.recipient)
        .bind(&message.channel)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(message_id = %id, channel = %message.channel, "Message queued");
        Ok(id)
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A message waiting for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub task_id: Option<Uuid>,
    pub recipient: String,
    pub channel: String,
    pub subject: Option<String>,
    pub body: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    organization_id: String,
    user_id: String,
    task_id: Option<String>,
    title: String,
    body: String,
    is_read: bool,
    created_at: String,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            organization_id: parse_uuid(&row.organization_id)?,
            user_id: parse_uuid(&row.user_id)?,
            task_id: parse_optional_uuid(row.task_id)?,
            title: row.title,
            body: row.body,
            is_read: row.is_read,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    organization_id: String,
    task_id: Option<String>,
    recipient: String,
    channel: String,
    subject: Option<String>,
    body: String,
    status: String,
    created_at: String,
}

impl TryFrom<MessageRow> for QueuedMessage {
    type Error = DomainError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            organization_id: parse_uuid(&row.organization_id)?,
            task_id: parse_optional_uuid(row.task_id)?,
            recipient: row.recipient,
            channel: row.channel,
            subject: row.subject,
            body: row.body,
            status: row.status,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{Stage, Step, TaskStatus, Workflow};
    use serde_json::json;

    async fn setup() -> (SqliteAutomationGateway, SqliteHierarchyStore, Step) {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = SqliteHierarchyStore::new(pool.clone());
        let workflow = Workflow::new(Uuid::new_v4(), "Tax return");
        let stage = Stage::new(workflow.id, "Prepare", 0);
        let step = Step::new(stage.id, "Gather", 0);
        store.insert_workflow(&workflow).await.unwrap();
        store.insert_stage(&stage).await.unwrap();
        store.insert_step(&step).await.unwrap();
        (SqliteAutomationGateway::new(pool), store, step)
    }

    #[tokio::test]
    async fn test_create_task_appends_to_step() {
        let (gateway, store, step) = setup().await;
        store.insert_task(&Task::new(step.id, "Existing").with_order(4)).await.unwrap();

        let id = gateway
            .create_task(NewTask {
                step_id: step.id,
                title: "Follow up".to_string(),
                description: "Chase missing W-2".to_string(),
                assigned_to: None,
            })
            .await
            .unwrap();

        let created = store.get_task(id).await.unwrap().unwrap();
        assert_eq!(created.order, 5);
        assert_eq!(created.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_task_unknown_step() {
        let (gateway, _, _) = setup().await;
        let err = gateway
            .create_task(NewTask {
                step_id: Uuid::new_v4(),
                title: "Orphan".to_string(),
                description: String::new(),
                assigned_to: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Step", .. }));
    }

    #[tokio::test]
    async fn test_update_task_fields_whitelist() {
        let (gateway, store, step) = setup().await;
        let task = Task::new(step.id, "Draft letter");
        store.insert_task(&task).await.unwrap();

        let assignee = Uuid::new_v4();
        let fields = json!({"title": "Send letter", "assigned_to": assignee.to_string()});
        gateway
            .update_task_fields(task.id, fields.as_object().unwrap())
            .await
            .unwrap();

        let updated = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Send letter");
        assert_eq!(updated.assigned_to, Some(assignee));
        assert_eq!(updated.version, 1);

        let status = json!({"status": "completed"});
        let err = gateway
            .update_task_fields(task.id, status.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            store.get_task(task.id).await.unwrap().unwrap().status,
            TaskStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_notifications_and_messages_are_persisted() {
        let (gateway, _, _) = setup().await;
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let task = Uuid::new_v4();

        gateway
            .create_notification(NewNotification {
                organization_id: org,
                user_id: user,
                task_id: Some(task),
                title: "Documents received".to_string(),
                body: String::new(),
            })
            .await
            .unwrap();
        gateway
            .send_message(OutgoingMessage {
                organization_id: org,
                task_id: Some(task),
                recipient: "client@example.com".to_string(),
                channel: "email".to_string(),
                subject: Some("Thanks".to_string()),
                body: "We got your files".to_string(),
            })
            .await
            .unwrap();

        let notifications = gateway.list_notifications(user).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(!notifications[0].is_read);

        let messages = gateway.list_messages(task).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, "queued");
    }
}
