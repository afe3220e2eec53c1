//! Workflow template loader from YAML files
//!
//! A template describes a whole hierarchy. Instantiating it for an
//! organization yields a [`WorkflowPlan`] of fresh entities that is validated
//! in full before anything is written.

use crate::adapters::sqlite::SqliteHierarchyStore;
use crate::domain::models::{
    AutomationAction, ChecklistItem, Condition, Stage, Step, Subtask, Task, TaskType, Workflow,
    WorkflowStatus,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Template structure for loading workflows from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    #[serde(default)]
    pub status: Option<WorkflowStatus>,
    #[serde(default)]
    pub is_automated: bool,
    pub stages: Vec<StageTemplate>,
}

/// A stage in a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemplate {
    pub name: String,
    #[serde(default = "default_true")]
    pub auto_progress: bool,
    #[serde(default)]
    pub steps: Vec<StepTemplate>,
}

/// A step in a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTemplate {
    pub name: String,
    #[serde(default = "default_true")]
    pub auto_progress: bool,
    #[serde(default)]
    pub tasks: Vec<TaskTemplate>,
}

/// A task in a workflow template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default)]
    pub review_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<AutomationAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<UnitTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<UnitTemplate>,
}

/// A subtask or checklist entry; a bare string is a required unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitTemplate {
    Title(String),
    Detailed {
        title: String,
        #[serde(default = "default_true")]
        required: bool,
    },
}

impl UnitTemplate {
    fn parts(&self) -> (&str, bool) {
        match self {
            Self::Title(title) => (title, true),
            Self::Detailed { title, required } => (title, *required),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Every entity of one instantiated template, parents before children.
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub workflow: Workflow,
    pub stages: Vec<Stage>,
    pub steps: Vec<Step>,
    pub tasks: Vec<Task>,
    pub subtasks: Vec<Subtask>,
    pub checklist_items: Vec<ChecklistItem>,
}

impl WorkflowPlan {
    /// Insert the whole plan.
    pub async fn persist(&self, store: &SqliteHierarchyStore) -> Result<()> {
        store.insert_workflow(&self.workflow).await?;
        for stage in &self.stages {
            store.insert_stage(stage).await?;
        }
        for step in &self.steps {
            store.insert_step(step).await?;
        }
        for task in &self.tasks {
            store.insert_task(task).await?;
        }
        for subtask in &self.subtasks {
            store.insert_subtask(subtask).await?;
        }
        for item in &self.checklist_items {
            store.insert_checklist_item(item).await?;
        }

        info!(
            workflow_id = %self.workflow.id,
            stages = self.stages.len(),
            tasks = self.tasks.len(),
            "Workflow imported"
        );
        Ok(())
    }
}

/// Loader for workflow templates
pub struct WorkflowLoader;

impl WorkflowLoader {
    /// Load a template from a YAML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<WorkflowTemplate> {
        let path = path.as_ref();
        debug!("Loading workflow template from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read template file: {}", path.display()))?;
        Self::load_from_yaml(&content)
    }

    /// Load a template from a YAML string
    pub fn load_from_yaml(yaml: &str) -> Result<WorkflowTemplate> {
        let template: WorkflowTemplate =
            serde_yaml::from_str(yaml).context("Failed to parse YAML template")?;
        if template.name.trim().is_empty() {
            bail!("Workflow template needs a name");
        }
        Ok(template)
    }

    /// Build fresh entities for `organization_id`.
    pub fn instantiate(template: &WorkflowTemplate, organization_id: Uuid) -> Result<WorkflowPlan> {
        let mut workflow = Workflow::new(organization_id, template.name.trim());
        workflow.is_automated = template.is_automated;
        if let Some(status) = template.status {
            workflow.status = status;
        }
        workflow.total_stages = u32::try_from(template.stages.len()).unwrap_or(u32::MAX);

        let mut plan = WorkflowPlan {
            workflow,
            stages: Vec::new(),
            steps: Vec::new(),
            tasks: Vec::new(),
            subtasks: Vec::new(),
            checklist_items: Vec::new(),
        };

        for (stage_index, stage_template) in (0_i32..).zip(&template.stages) {
            let stage = Stage::new(plan.workflow.id, &stage_template.name, stage_index)
                .with_auto_progress(stage_template.auto_progress);

            for (step_index, step_template) in (0_i32..).zip(&stage_template.steps) {
                let step = Step::new(stage.id, &step_template.name, step_index)
                    .with_auto_progress(step_template.auto_progress);

                for (task_index, task_template) in (0_i32..).zip(&step_template.tasks) {
                    let task = build_task(step.id, task_index, task_template).with_context(|| {
                        format!(
                            "Invalid task '{}' in step '{}'",
                            task_template.title, step_template.name
                        )
                    })?;

                    for unit in &task_template.subtasks {
                        let (title, required) = unit.parts();
                        let mut subtask = Subtask::new(task.id, title);
                        subtask.required = required;
                        plan.subtasks.push(subtask);
                    }
                    for unit in &task_template.checklist {
                        let (label, required) = unit.parts();
                        let mut item = ChecklistItem::new(task.id, label);
                        item.required = required;
                        plan.checklist_items.push(item);
                    }
                    plan.tasks.push(task);
                }
                plan.steps.push(step);
            }
            plan.stages.push(stage);
        }

        Ok(plan)
    }
}

fn build_task(step_id: Uuid, order: i32, template: &TaskTemplate) -> Result<Task> {
    if template.title.trim().is_empty() {
        bail!("Task title cannot be empty");
    }

    let mut task = match template.task_type {
        TaskType::Manual => Task::new(step_id, template.title.trim()),
        TaskType::Automated => {
            let task = Task::automated(
                step_id,
                template.title.trim(),
                template.agent.clone().unwrap_or_default(),
                template.input.clone().unwrap_or(Value::Null),
            );
            task.validate_automation()?;
            task
        }
    };

    task.order = order;
    task.description = template.description.clone();
    task.llm_config = template.llm_config.clone();
    task.review_required = template.review_required;
    task.assigned_to = template.assigned_to;
    task.automation_conditions = template.conditions.clone();
    task.automation_actions = template.actions.clone();
    Ok(task)
}
