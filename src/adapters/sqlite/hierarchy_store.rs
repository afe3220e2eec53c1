//! SQLite implementation of the HierarchyStore.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_datetime, parse_json, parse_optional_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ChecklistItem, ReviewStatus, Stage, Step, Subtask, Task, TaskStatus, TaskType, UnitStatus,
    Workflow, WorkflowStatus,
};
use crate::domain::ports::HierarchyStore;

/// Workflow hierarchy storage with conditional completion writes.
#[derive(Clone)]
pub struct SqliteHierarchyStore {
    pool: SqlitePool,
}

impl SqliteHierarchyStore {
    /// Create a store over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new workflow row.
    pub async fn insert_workflow(&self, workflow: &Workflow) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO workflows (id, organization_id, name, status, is_automated, total_stages,
               created_at, updated_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(workflow.id.to_string())
        .bind(workflow.organization_id.to_string())
        .bind(&workflow.name)
        .bind(workflow.status.as_str())
        .bind(workflow.is_automated)
        .bind(i64::from(workflow.total_stages))
        .bind(workflow.created_at.to_rfc3339())
        .bind(workflow.updated_at.to_rfc3339())
        .bind(workflow.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new stage row.
    pub async fn insert_stage(&self, stage: &Stage) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO stages (id, workflow_id, name, sort_order, auto_progress, status,
               created_at, updated_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(stage.id.to_string())
        .bind(stage.workflow_id.to_string())
        .bind(&stage.name)
        .bind(stage.order)
        .bind(stage.auto_progress)
        .bind(stage.status.as_str())
        .bind(stage.created_at.to_rfc3339())
        .bind(stage.updated_at.to_rfc3339())
        .bind(stage.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        // Denormalized count, refreshed whenever a stage is added.
        sqlx::query(
            "UPDATE workflows \
             SET total_stages = (SELECT COUNT(*) FROM stages WHERE workflow_id = ?) \
             WHERE id = ?",
        )
        .bind(stage.workflow_id.to_string())
        .bind(stage.workflow_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new step row.
    pub async fn insert_step(&self, step: &Step) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO steps (id, stage_id, name, sort_order, auto_progress, status,
               created_at, updated_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(step.id.to_string())
        .bind(step.stage_id.to_string())
        .bind(&step.name)
        .bind(step.order)
        .bind(step.auto_progress)
        .bind(step.status.as_str())
        .bind(step.created_at.to_rfc3339())
        .bind(step.updated_at.to_rfc3339())
        .bind(step.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new task row, including its actions and conditions.
    pub async fn insert_task(&self, task: &Task) -> DomainResult<()> {
        let input = task.automation_input.as_ref().map(serde_json::to_string).transpose()?;
        let output = task.automation_output.as_ref().map(serde_json::to_string).transpose()?;
        let conditions = serde_json::to_string(&task.automation_conditions)?;
        let actions = serde_json::to_string(&task.automation_actions)?;

        sqlx::query(
            r#"INSERT INTO tasks (id, step_id, title, description, sort_order, task_type, status,
               ai_agent_id, llm_config, automation_input, automation_output, automation_conditions,
               automation_actions, review_required, review_status, reviewed_by, review_notes,
               reviewed_at, assigned_to, completed_by, version, created_at, updated_at,
               started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(task.step_id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.order)
        .bind(task.task_type.as_str())
        .bind(task.status.as_str())
        .bind(&task.ai_agent_id)
        .bind(&task.llm_config)
        .bind(input)
        .bind(output)
        .bind(conditions)
        .bind(actions)
        .bind(task.review_required)
        .bind(task.review_status.map(|s| s.as_str()))
        .bind(task.reviewed_by.map(|id| id.to_string()))
        .bind(&task.review_notes)
        .bind(task.reviewed_at.map(|t| t.to_rfc3339()))
        .bind(task.assigned_to.map(|id| id.to_string()))
        .bind(task.completed_by.map(|id| id.to_string()))
        .bind(version_to_db(task.version))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a subtask.
    pub async fn insert_subtask(&self, subtask: &Subtask) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO subtasks (id, task_id, title, required, completed, completed_by,
               completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(subtask.id.to_string())
        .bind(subtask.task_id.to_string())
        .bind(&subtask.title)
        .bind(subtask.required)
        .bind(subtask.completed)
        .bind(subtask.completed_by.map(|id| id.to_string()))
        .bind(subtask.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a checklist item.
    pub async fn insert_checklist_item(&self, item: &ChecklistItem) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO checklist_items (id, task_id, label, required, is_checked, checked_by,
               checked_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(item.id.to_string())
        .bind(item.task_id.to_string())
        .bind(&item.label)
        .bind(item.required)
        .bind(item.is_checked)
        .bind(item.checked_by.map(|id| id.to_string()))
        .bind(item.checked_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Workflows, newest first, optionally for one organization.
    pub async fn list_workflows(
        &self,
        organization_id: Option<Uuid>,
    ) -> DomainResult<Vec<Workflow>> {
        let rows: Vec<WorkflowRow> = match organization_id {
            Some(org) => {
                sqlx::query_as(
                    "SELECT * FROM workflows WHERE organization_id = ? ORDER BY created_at DESC",
                )
                .bind(org.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM workflows ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl HierarchyStore for SqliteHierarchyStore {
    async fn get_workflow(&self, id: Uuid) -> DomainResult<Option<Workflow>> {
        let row: Option<WorkflowRow> = sqlx::query_as("SELECT * FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_stage(&self, id: Uuid) -> DomainResult<Option<Stage>> {
        let row: Option<StageRow> = sqlx::query_as("SELECT * FROM stages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_step(&self, id: Uuid) -> DomainResult<Option<Step>> {
        let row: Option<StepRow> = sqlx::query_as("SELECT * FROM steps WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_task(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_subtask(&self, id: Uuid) -> DomainResult<Option<Subtask>> {
        let row: Option<SubtaskRow> = sqlx::query_as("SELECT * FROM subtasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_checklist_item(&self, id: Uuid) -> DomainResult<Option<ChecklistItem>> {
        let row: Option<ChecklistItemRow> =
            sqlx::query_as("SELECT * FROM checklist_items WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_stages(&self, workflow_id: Uuid) -> DomainResult<Vec<Stage>> {
        let rows: Vec<StageRow> =
            sqlx::query_as("SELECT * FROM stages WHERE workflow_id = ? ORDER BY sort_order, id")
                .bind(workflow_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_steps(&self, stage_id: Uuid) -> DomainResult<Vec<Step>> {
        let rows: Vec<StepRow> =
            sqlx::query_as("SELECT * FROM steps WHERE stage_id = ? ORDER BY sort_order, id")
                .bind(stage_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_tasks(&self, step_id: Uuid) -> DomainResult<Vec<Task>> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM tasks WHERE step_id = ? ORDER BY sort_order, id")
                .bind(step_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_subtasks(&self, task_id: Uuid) -> DomainResult<Vec<Subtask>> {
        let rows: Vec<SubtaskRow> =
            sqlx::query_as("SELECT * FROM subtasks WHERE task_id = ? ORDER BY rowid")
                .bind(task_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_checklist_items(&self, task_id: Uuid) -> DomainResult<Vec<ChecklistItem>> {
        let rows: Vec<ChecklistItemRow> =
            sqlx::query_as("SELECT * FROM checklist_items WHERE task_id = ? ORDER BY rowid")
                .bind(task_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_task(&self, task: &mut Task) -> DomainResult<()> {
        let input = task.automation_input.as_ref().map(serde_json::to_string).transpose()?;
        let output = task.automation_output.as_ref().map(serde_json::to_string).transpose()?;
        let conditions = serde_json::to_string(&task.automation_conditions)?;
        let actions = serde_json::to_string(&task.automation_actions)?;

        let result = sqlx::query(
            r#"UPDATE tasks SET title = ?, description = ?, sort_order = ?, task_type = ?,
               status = ?,
               ai_agent_id = ?, llm_config = ?, automation_input = ?, automation_output = ?,
               automation_conditions = ?, automation_actions = ?, review_required = ?,
               review_status = ?, reviewed_by = ?, review_notes = ?, reviewed_at = ?,
               assigned_to = ?, completed_by = ?, updated_at = ?, started_at = ?, completed_at = ?,
               version = version + 1
               WHERE id = ? AND version = ?"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.order)
        .bind(task.task_type.as_str())
        .bind(task.status.as_str())
        .bind(&task.ai_agent_id)
        .bind(&task.llm_config)
        .bind(input)
        .bind(output)
        .bind(conditions)
        .bind(actions)
        .bind(task.review_required)
        .bind(task.review_status.map(|s| s.as_str()))
        .bind(task.reviewed_by.map(|id| id.to_string()))
        .bind(&task.review_notes)
        .bind(task.reviewed_at.map(|t| t.to_rfc3339()))
        .bind(task.assigned_to.map(|id| id.to_string()))
        .bind(task.completed_by.map(|id| id.to_string()))
        .bind(task.updated_at.to_rfc3339())
        .bind(task.started_at.map(|t| t.to_rfc3339()))
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.id.to_string())
        .bind(version_to_db(task.version))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tasks WHERE id = ?")
                .bind(task.id.to_string())
                .fetch_optional(&self.pool)
                .await?;
            return Err(match exists {
                Some(_) => DomainError::ConcurrencyConflict {
                    entity: "Task",
                    id: task.id,
                },
                None => DomainError::task_not_found(task.id),
            });
        }

        task.version += 1;
        Ok(())
    }

    async fn update_subtask(&self, subtask: &Subtask) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE subtasks SET title = ?, required = ?, completed = ?, completed_by = ?, \
             completed_at = ? WHERE id = ?",
        )
        .bind(&subtask.title)
        .bind(subtask.required)
        .bind(subtask.completed)
        .bind(subtask.completed_by.map(|id| id.to_string()))
        .bind(subtask.completed_at.map(|t| t.to_rfc3339()))
        .bind(subtask.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::subtask_not_found(subtask.id));
        }
        Ok(())
    }

    async fn update_checklist_item(&self, item: &ChecklistItem) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE checklist_items SET label = ?, required = ?, is_checked = ?, checked_by = ?, \
             checked_at = ? WHERE id = ?",
        )
        .bind(&item.label)
        .bind(item.required)
        .bind(item.is_checked)
        .bind(item.checked_by.map(|id| id.to_string()))
        .bind(item.checked_at.map(|t| t.to_rfc3339()))
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::checklist_item_not_found(item.id));
        }
        Ok(())
    }

    async fn complete_task_if_units_satisfied(&self, task: &Task) -> DomainResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE tasks SET status = 'completed', completed_at = ?, updated_at = ?,
               version = version + 1
               WHERE id = ? AND version = ? AND status != 'completed'
                 AND (EXISTS (SELECT 1 FROM subtasks s WHERE s.task_id = tasks.id)
                      OR EXISTS (SELECT 1 FROM checklist_items c WHERE c.task_id = tasks.id))
                 AND NOT EXISTS (SELECT 1 FROM subtasks s
                                 WHERE s.task_id = tasks.id AND s.required = 1 AND s.completed = 0)
                 AND NOT EXISTS (SELECT 1 FROM checklist_items c
                                 WHERE c.task_id = tasks.id AND c.required = 1
                                   AND c.is_checked = 0)"#,
        )
        .bind(&now)
        .bind(&now)
        .bind(task.id.to_string())
        .bind(version_to_db(task.version))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_step_if_ready(&self, step_id: Uuid) -> DomainResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE steps SET status = 'completed', completed_at = ?, updated_at = ?
               WHERE id = ? AND status != 'completed' AND auto_progress = 1
                 AND EXISTS (SELECT 1 FROM tasks t WHERE t.step_id = steps.id)
                 AND NOT EXISTS (SELECT 1 FROM tasks t
                                 WHERE t.step_id = steps.id AND t.status != 'completed')"#,
        )
        .bind(&now)
        .bind(&now)
        .bind(step_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_stage_if_ready(&self, stage_id: Uuid) -> DomainResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE stages SET status = 'completed', completed_at = ?, updated_at = ?
               WHERE id = ? AND status != 'completed' AND auto_progress = 1
                 AND EXISTS (SELECT 1 FROM steps s WHERE s.stage_id = stages.id)
                 AND NOT EXISTS (SELECT 1 FROM steps s
                                 WHERE s.stage_id = stages.id AND s.status != 'completed')"#,
        )
        .bind(&now)
        .bind(&now)
        .bind(stage_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_workflow_if_ready(&self, workflow_id: Uuid) -> DomainResult<bool> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"UPDATE workflows SET status = 'completed', completed_at = ?, updated_at = ?
               WHERE id = ? AND status IN ('draft', 'active')
                 AND EXISTS (SELECT 1 FROM stages s WHERE s.workflow_id = workflows.id)
                 AND NOT EXISTS (SELECT 1 FROM stages s
                                 WHERE s.workflow_id = workflows.id AND s.status != 'completed')"#,
        )
        .bind(&now)
        .bind(&now)
        .bind(workflow_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn version_to_db(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

#[derive(sqlx::FromRow)]
struct WorkflowRow {
    id: String,
    organization_id: String,
    name: String,
    status: String,
    is_automated: bool,
    total_stages: i64,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<WorkflowRow> for Workflow {
    type Error = DomainError;

    fn try_from(row: WorkflowRow) -> Result<Self, Self::Error> {
        Ok(Workflow {
            id: parse_uuid(&row.id)?,
            organization_id: parse_uuid(&row.organization_id)?,
            name: row.name,
            status: WorkflowStatus::from_str(&row.status).ok_or_else(|| {
                DomainError::Serialization(format!("Invalid workflow status: {}", row.status))
            })?,
            is_automated: row.is_automated,
            total_stages: u32::try_from(row.total_stages).unwrap_or_default(),
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

fn parse_unit_status(s: &str) -> DomainResult<UnitStatus> {
    UnitStatus::from_str(s)
        .ok_or_else(|| DomainError::Serialization(format!("Invalid status: {s}")))
}

#[derive(sqlx::FromRow)]
struct StageRow {
    id: String,
    workflow_id: String,
    name: String,
    sort_order: i32,
    auto_progress: bool,
    status: String,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<StageRow> for Stage {
    type Error = DomainError;

    fn try_from(row: StageRow) -> Result<Self, Self::Error> {
        Ok(Stage {
            id: parse_uuid(&row.id)?,
            workflow_id: parse_uuid(&row.workflow_id)?,
            name: row.name,
            order: row.sort_order,
            auto_progress: row.auto_progress,
            status: parse_unit_status(&row.status)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    stage_id: String,
    name: String,
    sort_order: i32,
    auto_progress: bool,
    status: String,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<StepRow> for Step {
    type Error = DomainError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(Step {
            id: parse_uuid(&row.id)?,
            stage_id: parse_uuid(&row.stage_id)?,
            name: row.name,
            order: row.sort_order,
            auto_progress: row.auto_progress,
            status: parse_unit_status(&row.status)?,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    step_id: String,
    title: String,
    description: String,
    sort_order: i32,
    task_type: String,
    status: String,
    ai_agent_id: Option<String>,
    llm_config: Option<String>,
    automation_input: Option<String>,
    automation_output: Option<String>,
    automation_conditions: String,
    automation_actions: String,
    review_required: bool,
    review_status: Option<String>,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    reviewed_at: Option<String>,
    assigned_to: Option<String>,
    completed_by: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let task_type = TaskType::from_str(&row.task_type).ok_or_else(|| {
            DomainError::Serialization(format!("Invalid task type: {}", row.task_type))
        })?;
        let status = TaskStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::Serialization(format!("Invalid status: {}", row.status)))?;
        let review_status = row
            .review_status
            .map(|s| {
                ReviewStatus::from_str(&s).ok_or_else(|| {
                    DomainError::Serialization(format!("Invalid review status: {s}"))
                })
            })
            .transpose()?;

        Ok(Task {
            id: parse_uuid(&row.id)?,
            step_id: parse_uuid(&row.step_id)?,
            title: row.title,
            description: row.description,
            order: row.sort_order,
            task_type,
            status,
            ai_agent_id: row.ai_agent_id,
            llm_config: row.llm_config,
            automation_input: row.automation_input.as_deref().map(parse_json).transpose()?,
            automation_output: row.automation_output.as_deref().map(parse_json).transpose()?,
            automation_conditions: parse_json(&row.automation_conditions)?,
            automation_actions: parse_json(&row.automation_actions)?,
            review_required: row.review_required,
            review_status,
            reviewed_by: parse_optional_uuid(row.reviewed_by)?,
            review_notes: row.review_notes,
            reviewed_at: parse_optional_datetime(row.reviewed_at)?,
            assigned_to: parse_optional_uuid(row.assigned_to)?,
            completed_by: parse_optional_uuid(row.completed_by)?,
            version: u64::try_from(row.version).unwrap_or_default(),
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            started_at: parse_optional_datetime(row.started_at)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubtaskRow {
    id: String,
    task_id: String,
    title: String,
    required: bool,
    completed: bool,
    completed_by: Option<String>,
    completed_at: Option<String>,
}

impl TryFrom<SubtaskRow> for Subtask {
    type Error = DomainError;

    fn try_from(row: SubtaskRow) -> Result<Self, Self::Error> {
        Ok(Subtask {
            id: parse_uuid(&row.id)?,
            task_id: parse_uuid(&row.task_id)?,
            title: row.title,
            required: row.required,
            completed: row.completed,
            completed_by: parse_optional_uuid(row.completed_by)?,
            completed_at: parse_optional_datetime(row.completed_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChecklistItemRow {
    id: String,
    task_id: String,
    label: String,
    required: bool,
    is_checked: bool,
    checked_by: Option<String>,
    checked_at: Option<String>,
}

impl TryFrom<ChecklistItemRow> for ChecklistItem {
    type Error = DomainError;

    fn try_from(row: ChecklistItemRow) -> Result<Self, Self::Error> {
        Ok(ChecklistItem {
            id: parse_uuid(&row.id)?,
            task_id: parse_uuid(&row.task_id)?,
            label: row.label,
            required: row.required,
            is_checked: row.is_checked,
            checked_by: parse_optional_uuid(row.checked_by)?,
            checked_at: parse_optional_datetime(row.checked_at)?,
        })
    }
}
