//! Auto-progression cascade: Task → Step → Stage → Workflow.
//!
//! Each level re-derives "am I done?" from the persisted state of its
//! children through one conditional store write. Only the call that actually
//! performed a flip propagates upward, so redundant or concurrent triggers
//! never double-complete a node and never lose the final check.
//!
//! Failures are logged and reported in the returned [`CascadeReport`]; they
//! are never surfaced as errors because the triggering write already
//! succeeded.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActivityEvent, ActivityKind};
use crate::domain::ports::{ActivityLogger, HierarchyStore};
use crate::services::event_bus::emit;
use crate::services::hierarchy::{
    require_stage, require_step, require_task, require_workflow, MAX_WRITE_ATTEMPTS,
};

/// A node completed by a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum HierarchyNode {
    Task(Uuid),
    Step(Uuid),
    Stage(Uuid),
    Workflow(Uuid),
}

/// What one cascade call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Nodes completed by this call, bottom-up.
    pub completed: Vec<HierarchyNode>,
    /// The swallowed failure that stopped the cascade, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CascadeReport {
    /// Nothing completed.
    pub fn is_noop(&self) -> bool {
        self.completed.is_empty()
    }

    /// Whether the cascade reached the workflow.
    pub fn completed_workflow(&self) -> bool {
        self.completed
            .iter()
            .any(|n| matches!(n, HierarchyNode::Workflow(_)))
    }
}

/// Completes steps, stages and workflows once their children are done.
pub struct AutoProgressionEngine {
    store: Arc<dyn HierarchyStore>,
    activity: Arc<dyn ActivityLogger>,
}

impl AutoProgressionEngine {
    /// Create an engine over the hierarchy store.
    pub fn new(store: Arc<dyn HierarchyStore>, activity: Arc<dyn ActivityLogger>) -> Self {
        Self { store, activity }
    }

    /// Complete the task if its sub-units and AI gate are satisfied, then
    /// cascade to its step. A task that is already completed goes straight
    /// to the step check.
    #[tracing::instrument(skip(self))]
    pub async fn try_auto_progress_task(&self, task_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();
        if let Err(e) = self.progress_task(task_id, &mut report).await {
            tracing::warn!(task_id = %task_id, error = %e, "Task cascade failed");
            report.error = Some(e.to_string());
        }
        report
    }

    /// Complete the step if ready, then cascade upward.
    #[tracing::instrument(skip(self))]
    pub async fn try_auto_progress_step(&self, step_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();
        if let Err(e) = self.progress_step(step_id, &mut report).await {
            tracing::warn!(step_id = %step_id, error = %e, "Step cascade failed");
            report.error = Some(e.to_string());
        }
        report
    }

    /// Complete the stage if ready, then cascade upward.
    #[tracing::instrument(skip(self))]
    pub async fn try_auto_progress_stage(&self, stage_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();
        if let Err(e) = self.progress_stage(stage_id, &mut report).await {
            tracing::warn!(stage_id = %stage_id, error = %e, "Stage cascade failed");
            report.error = Some(e.to_string());
        }
        report
    }

    /// Complete the workflow if every required stage is done.
    #[tracing::instrument(skip(self))]
    pub async fn try_auto_progress_workflow(&self, workflow_id: Uuid) -> CascadeReport {
        let mut report = CascadeReport::default();
        if let Err(e) = self.progress_workflow(workflow_id, &mut report).await {
            tracing::warn!(workflow_id = %workflow_id, error = %e, "Workflow cascade failed");
            report.error = Some(e.to_string());
        }
        report
    }

    async fn progress_task(&self, task_id: Uuid, report: &mut CascadeReport) -> DomainResult<()> {
        let mut attempts = 0;
        let task = loop {
            attempts += 1;
            let task = require_task(self.store.as_ref(), task_id).await?;
            if task.is_completed() {
                // Re-check the step so a cascade stopped earlier can resume.
                return self.progress_step(task.step_id, report).await;
            }
            if !task.ai_gate_satisfied() {
                tracing::debug!(task_id = %task_id, "AI output not accepted yet, task stays open");
                return Ok(());
            }
            if self.store.complete_task_if_units_satisfied(&task).await? {
                break task;
            }

            // A refused flip is final unless a concurrent write moved the
            // version under us; then the gate is re-read.
            let current = require_task(self.store.as_ref(), task_id).await?;
            if current.is_completed() {
                return self.progress_step(current.step_id, report).await;
            }
            if current.version == task.version || attempts >= MAX_WRITE_ATTEMPTS {
                return Ok(());
            }
        };

        tracing::info!(task_id = %task_id, step_id = %task.step_id, "Task auto-completed");
        report.completed.push(HierarchyNode::Task(task_id));
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                None,
                ActivityKind::TaskCompleted {
                    task_id,
                    step_id: task.step_id,
                    automatic: true,
                },
            ),
        )
        .await;

        self.progress_step(task.step_id, report).await
    }

    async fn progress_step(&self, step_id: Uuid, report: &mut CascadeReport) -> DomainResult<()> {
        let step = require_step(self.store.as_ref(), step_id).await?;
        if step.status.is_completed() || !step.auto_progress {
            return Ok(());
        }
        if !self.store.complete_step_if_ready(step_id).await? {
            return Ok(());
        }

        tracing::info!(step_id = %step_id, stage_id = %step.stage_id, "Step completed");
        report.completed.push(HierarchyNode::Step(step_id));
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                None,
                ActivityKind::StepCompleted {
                    step_id,
                    stage_id: step.stage_id,
                },
            ),
        )
        .await;

        self.progress_stage(step.stage_id, report).await
    }

    async fn progress_stage(&self, stage_id: Uuid, report: &mut CascadeReport) -> DomainResult<()> {
        let stage = require_stage(self.store.as_ref(), stage_id).await?;
        if stage.status.is_completed() || !stage.auto_progress {
            return Ok(());
        }
        if !self.store.complete_stage_if_ready(stage_id).await? {
            return Ok(());
        }

        tracing::info!(stage_id = %stage_id, workflow_id = %stage.workflow_id, "Stage completed");
        report.completed.push(HierarchyNode::Stage(stage_id));
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                None,
                ActivityKind::StageCompleted {
                    stage_id,
                    workflow_id: stage.workflow_id,
                },
            ),
        )
        .await;

        self.progress_workflow(stage.workflow_id, report).await
    }

    async fn progress_workflow(
        &self,
        workflow_id: Uuid,
        report: &mut CascadeReport,
    ) -> DomainResult<()> {
        let workflow = require_workflow(self.store.as_ref(), workflow_id).await?;
        if !workflow.status.accepts_completion() {
            return Ok(());
        }
        if !self.store.complete_workflow_if_ready(workflow_id).await? {
            return Ok(());
        }

        tracing::info!(workflow_id = %workflow_id, "Workflow completed");
        report.completed.push(HierarchyNode::Workflow(workflow_id));
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(None, ActivityKind::WorkflowCompleted { workflow_id }),
        )
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_helpers() {
        let mut report = CascadeReport::default();
        assert!(report.is_noop());
        assert!(!report.completed_workflow());

        report.completed.push(HierarchyNode::Step(Uuid::new_v4()));
        report.completed.push(HierarchyNode::Workflow(Uuid::new_v4()));
        assert!(!report.is_noop());
        assert!(report.completed_workflow());
    }

    #[test]
    fn test_node_serializes_with_level() {
        let id = Uuid::nil();
        let json = serde_json::to_value(HierarchyNode::Stage(id)).unwrap();
        assert_eq!(json["level"], "stage");
        assert_eq!(json["id"], id.to_string());
    }
}
