//! AI agent execution and the review gate.
//!
//! Runs an automated task's agent and applies the review policy: output
//! either completes the task at once or is parked in `pending_review` for a
//! human. Adapter failures and timeouts are turned into task state (back to
//! `pending` with an `{error}` payload) and reported as
//! [`AutomationOutcome::Failed`] rather than as an `Err`.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    normalize_agent_slug, ActivityEvent, ActivityKind, AgentOutput, AgentRequest, ReviewStatus,
    Task, TaskType,
};
use crate::domain::ports::{
    ActivityLogger, AgentAdapter, AgentInstallations, HierarchyStore, LlmConfigProvider,
};
use crate::services::agent_registry::AgentRegistry;
use crate::services::auto_progression::{AutoProgressionEngine, CascadeReport};
use crate::services::event_bus::emit;
use crate::services::hierarchy::{load_lineage, modify_task};
use crate::services::task_state_machine::TaskStateMachine;

/// Result of one agent run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutomationOutcome {
    /// Output accepted without review; the task is completed.
    Completed { task: Task, cascade: CascadeReport },
    /// Output stored and waiting for a reviewer.
    AwaitingReview { task: Task },
    /// The agent failed or timed out; the task is back to `pending`.
    Failed { task: Task, error: String },
}

impl AutomationOutcome {
    /// The task as it was left after the run.
    pub fn task(&self) -> &Task {
        match self {
            Self::Completed { task, .. }
            | Self::AwaitingReview { task }
            | Self::Failed { task, .. } => task,
        }
    }

    /// Whether the agent call failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of an approved review.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewApproval {
    pub task: Task,
    pub cascade: CascadeReport,
}

/// Runs a task's AI agent and records the outcome on the task.
pub struct AgentExecutor {
    store: Arc<dyn HierarchyStore>,
    registry: Arc<AgentRegistry>,
    installations: Arc<dyn AgentInstallations>,
    llm_configs: Arc<dyn LlmConfigProvider>,
    state_machine: Arc<TaskStateMachine>,
    progression: Arc<AutoProgressionEngine>,
    activity: Arc<dyn ActivityLogger>,
    default_timeout: Duration,
}

impl AgentExecutor {
    /// Create an executor with the default call timeout.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn HierarchyStore>,
        registry: Arc<AgentRegistry>,
        installations: Arc<dyn AgentInstallations>,
        llm_configs: Arc<dyn LlmConfigProvider>,
        state_machine: Arc<TaskStateMachine>,
        progression: Arc<AutoProgressionEngine>,
        activity: Arc<dyn ActivityLogger>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            installations,
            llm_configs,
            state_machine,
            progression,
            activity,
            default_timeout,
        }
    }

    /// Timeout applied when the caller gives none.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run the task's agent with the configured timeout.
    pub async fn execute_task_automation(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
    ) -> DomainResult<AutomationOutcome> {
        self.execute_task_automation_with_timeout(task_id, actor_id, self.default_timeout)
            .await
    }

    /// Run the task's agent, bounded by `timeout`.
    ///
    /// Setup problems (validation, missing installation or LLM config,
    /// invalid state) are returned as errors before any write.
    #[tracing::instrument(skip(self))]
    pub async fn execute_task_automation_with_timeout(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        timeout: Duration,
    ) -> DomainResult<AutomationOutcome> {
        let lineage = load_lineage(self.store.as_ref(), task_id).await?;
        let task = &lineage.task;
        let organization_id = lineage.organization_id();

        if task.task_type != TaskType::Automated {
            return Err(DomainError::Validation(format!(
                "Task {task_id} is not an automated task"
            )));
        }
        task.validate_automation()?;
        if task.is_completed() {
            return Err(DomainError::InvalidState(format!(
                "Task {task_id} is already completed"
            )));
        }
        if task.review_status == Some(ReviewStatus::PendingReview) {
            return Err(DomainError::InvalidState(format!(
                "Task {task_id} is waiting for review"
            )));
        }

        let slug = normalize_agent_slug(task.ai_agent_id.as_deref().unwrap_or_default());
        let adapter = self.resolve_agent(&slug, organization_id).await?;

        let llm = self
            .llm_configs
            .resolve(organization_id, task.llm_config.as_deref())
            .await?
            .filter(|c| c.is_usable())
            .ok_or_else(|| {
                DomainError::Configuration(format!(
                    "No usable LLM configuration for organization {organization_id}"
                ))
            })?;

        let input = task.automation_input.clone().unwrap_or_default();

        let (running, _) = modify_task(self.store.as_ref(), task_id, |t| {
            if t.is_completed() {
                return Err(DomainError::InvalidState(format!(
                    "Task {task_id} is already completed"
                )));
            }
            t.begin_run()?;
            Ok(true)
        })
        .await?;
        tracing::info!(task_id = %task_id, agent = %slug, "Agent run started");
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                Some(actor_id),
                ActivityKind::AutomationStarted {
                    task_id,
                    agent: slug.clone(),
                },
            ),
        )
        .await;

        let request = AgentRequest {
            task_id,
            organization_id,
            agent: slug.clone(),
            input,
            llm,
        };

        match invoke_with_timeout(adapter.as_ref(), request, timeout).await {
            Ok(output) => self.accept_output(running, actor_id, output).await,
            Err(e) => self.record_failure(task_id, actor_id, &slug, e).await,
        }
    }

    async fn resolve_agent(
        &self,
        slug: &str,
        organization_id: Uuid,
    ) -> DomainResult<Arc<dyn AgentAdapter>> {
        let not_installed = || DomainError::NotInstalled {
            agent: slug.to_string(),
            organization_id,
        };
        if !self.installations.is_enabled(organization_id, slug).await? {
            return Err(not_installed());
        }
        self.registry.resolve(slug).ok_or_else(not_installed)
    }

    async fn accept_output(
        &self,
        running: Task,
        actor_id: Uuid,
        output: AgentOutput,
    ) -> DomainResult<AutomationOutcome> {
        let task_id = running.id;
        let review_required = running.review_required;
        let result = output.result;

        let (task, _) = modify_task(self.store.as_ref(), task_id, |t| {
            t.automation_output = Some(result.clone());
            if review_required {
                t.request_review()?;
            }
            Ok(true)
        })
        .await?;

        if review_required {
            tracing::info!(task_id = %task_id, "Agent output awaiting review");
            emit(
                self.activity.as_ref(),
                ActivityEvent::new(Some(actor_id), ActivityKind::ReviewRequested { task_id }),
            )
            .await;
            return Ok(AutomationOutcome::AwaitingReview { task });
        }

        let completion = self.state_machine.complete_task(task_id, actor_id).await?;
        let cascade = self
            .progression
            .try_auto_progress_step(completion.task.step_id)
            .await;
        Ok(AutomationOutcome::Completed {
            task: completion.task,
            cascade,
        })
    }

    async fn record_failure(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        agent: &str,
        error: DomainError,
    ) -> DomainResult<AutomationOutcome> {
        let message = error.to_string();
        tracing::warn!(task_id = %task_id, agent = %agent, error = %message, "Agent run failed");

        let payload = json!({ "error": message });
        let (task, _) = modify_task(self.store.as_ref(), task_id, |t| {
            t.reset_to_pending(Some(payload.clone()))?;
            Ok(true)
        })
        .await?;

        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                Some(actor_id),
                ActivityKind::AutomationFailed {
                    task_id,
                    agent: agent.to_string(),
                    error: message.clone(),
                },
            ),
        )
        .await;

        Ok(AutomationOutcome::Failed {
            task,
            error: message,
        })
    }

    /// Accept pending output: the task is completed and the cascade runs.
    #[tracing::instrument(skip(self, notes))]
    pub async fn approve_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> DomainResult<ReviewApproval> {
        let (task, _) = modify_task(self.store.as_ref(), task_id, |t| {
            require_pending_review(t)?;
            t.approve(reviewer_id, notes.clone())?;
            Ok(true)
        })
        .await?;

        tracing::info!(task_id = %task_id, reviewer_id = %reviewer_id, "Review approved");
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(Some(reviewer_id), ActivityKind::ReviewApproved { task_id }),
        )
        .await;
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                Some(reviewer_id),
                ActivityKind::TaskCompleted {
                    task_id,
                    step_id: task.step_id,
                    automatic: false,
                },
            ),
        )
        .await;

        let cascade = self.progression.try_auto_progress_step(task.step_id).await;
        Ok(ReviewApproval { task, cascade })
    }

    /// Reject pending output: back to `pending` with the output cleared.
    /// Does not cascade.
    #[tracing::instrument(skip(self, notes))]
    pub async fn reject_review(
        &self,
        task_id: Uuid,
        reviewer_id: Uuid,
        notes: String,
    ) -> DomainResult<Task> {
        if notes.trim().is_empty() {
            return Err(DomainError::Validation(
                "Rejecting a review requires notes".to_string(),
            ));
        }

        let (task, _) = modify_task(self.store.as_ref(), task_id, |t| {
            require_pending_review(t)?;
            t.reject(reviewer_id, notes.clone())?;
            Ok(true)
        })
        .await?;

        tracing::info!(task_id = %task_id, reviewer_id = %reviewer_id, "Review rejected");
        emit(
            self.activity.as_ref(),
            ActivityEvent::new(
                Some(reviewer_id),
                ActivityKind::ReviewRejected { task_id, notes },
            ),
        )
        .await;

        Ok(task)
    }
}

fn require_pending_review(task: &Task) -> DomainResult<()> {
    if task.review_status == Some(ReviewStatus::PendingReview) {
        Ok(())
    } else {
        Err(DomainError::InvalidState(format!(
            "Task {} is not pending review (review status: {})",
            task.id,
            task.review_status.map_or("none", |s| s.as_str())
        )))
    }
}

/// Call the adapter; exceeding `timeout` is reported as `DomainError::Timeout`.
async fn invoke_with_timeout(
    adapter: &dyn AgentAdapter,
    request: AgentRequest,
    timeout: Duration,
) -> DomainResult<AgentOutput> {
    match tokio::time::timeout(timeout, adapter.execute(request)).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agents::{MockAgent, MockResponse};

    fn request() -> AgentRequest {
        AgentRequest {
            task_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            agent: "summarizer".to_string(),
            input: json!({"prompt": "summarize"}),
            llm: crate::domain::models::LlmConfig {
                name: "default".to_string(),
                provider: "openai".to_string(),
                model: "gpt-4o".to_string(),
                api_key: None,
            },
        }
    }

    #[tokio::test]
    async fn test_invoke_with_timeout_reports_timeout() {
        let agent = MockAgent::with_default_response(
            "summarizer",
            MockResponse::success(json!("done")).with_delay(Duration::from_millis(200)),
        );
        let err = invoke_with_timeout(&agent, request(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Timeout(_)));
        assert!(err.is_adapter_failure());
    }

    #[tokio::test]
    async fn test_invoke_with_timeout_passes_result() {
        let agent =
            MockAgent::with_default_response("summarizer", MockResponse::success(json!("done")));
        let out = invoke_with_timeout(&agent, request(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.result, json!("done"));
    }

    #[test]
    fn test_require_pending_review() {
        let mut task = Task::automated(Uuid::new_v4(), "Draft", "email-drafter", json!("x"));
        assert!(matches!(
            require_pending_review(&task),
            Err(DomainError::InvalidState(_))
        ));
        task.review_status = Some(ReviewStatus::PendingReview);
        assert!(require_pending_review(&task).is_ok());
    }
}
