//! Persistent activity log.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_json, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ActivityEvent, ActivityKind};
use crate::domain::ports::ActivityLogger;

/// Activity log backed by the `activity_events` table.
#[derive(Clone)]
pub struct SqliteActivityLog {
    pool: SqlitePool,
}

impl SqliteActivityLog {
    /// Create a log over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Events concerning one task, oldest first.
    pub async fn list_for_task(&self, task_id: Uuid) -> DomainResult<Vec<ActivityEvent>> {
        let rows: Vec<ActivityRow> =
            sqlx::query_as("SELECT * FROM activity_log WHERE task_id = ? ORDER BY timestamp, rowid")
                .bind(task_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Most recent events across the log, newest first.
    pub async fn list_recent(&self, limit: u32) -> DomainResult<Vec<ActivityEvent>> {
        let rows: Vec<ActivityRow> =
            sqlx::query_as("SELECT * FROM activity_log ORDER BY timestamp DESC, rowid DESC LIMIT ?")
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl ActivityLogger for SqliteActivityLog {
    async fn record(&self, event: ActivityEvent) -> DomainResult<()> {
        let payload = serde_json::to_string(&event.kind)?;
        sqlx::query(
            "INSERT INTO activity_log (id, timestamp, actor_id, kind, task_id, payload) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.timestamp.to_rfc3339())
        .bind(event.actor_id.map(|a| a.to_string()))
        .bind(event.kind_name())
        .bind(event.kind.task_id().map(|t| t.to_string()))
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    timestamp: String,
    actor_id: Option<String>,
    payload: String,
}

impl TryFrom<ActivityRow> for ActivityEvent {
    type Error = DomainError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let kind: ActivityKind = parse_json(&row.payload)?;
        Ok(Self {
            id: parse_uuid(&row.id)?,
            timestamp: parse_datetime(&row.timestamp)?,
            actor_id: parse_optional_uuid(row.actor_id)?,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_record_and_list_for_task() {
        let log = SqliteActivityLog::new(create_migrated_test_pool().await.unwrap());
        let task_id = Uuid::new_v4();
        let actor = Uuid::new_v4();

        log.record(ActivityEvent::new(
            Some(actor),
            ActivityKind::ReviewRejected {
                task_id,
                notes: "Wrong year".to_string(),
            },
        ))
        .await
        .unwrap();
        log.record(ActivityEvent::new(
            None,
            ActivityKind::WorkflowCompleted {
                workflow_id: Uuid::new_v4(),
            },
        ))
        .await
        .unwrap();

        let events = log.list_for_task(task_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor_id, Some(actor));
        assert_eq!(events[0].kind_name(), "review_rejected");

        assert_eq!(log.list_recent(10).await.unwrap().len(), 2);
    }
}
