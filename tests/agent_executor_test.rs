//! Integration tests for agent runs and the review gate.

mod common;

use std::time::Duration;

use caseflow::adapters::agents::{MockAgent, MockResponse};
use caseflow::domain::errors::DomainError;
use caseflow::domain::models::{ReviewStatus, TaskStatus};
use caseflow::services::{AutomationOutcome, EngineSettings};
use common::{Harness, AGENT};
use serde_json::json;

#[tokio::test]
async fn test_output_without_review_completes_task() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(AGENT, MockResponse::success(json!({"total": 1250}))),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Extract totals", json!({"document": "invoice.pdf"}), false)
        .await;

    let outcome = h.engine.execute_task_automation(task.id, h.actor).await.unwrap();
    let AutomationOutcome::Completed { task: done, cascade } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.automation_output, Some(json!({"total": 1250})));
    assert_eq!(done.completed_by, Some(h.actor));
    assert!(cascade.completed_workflow());

    let requests = h.agent.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].input, json!({"document": "invoice.pdf"}));
    assert_eq!(requests[0].organization_id, h.org);
    assert_eq!(requests[0].llm.model, "claude-sonnet");
}

#[tokio::test]
async fn test_review_required_parks_output_until_approved() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(AGENT, MockResponse::success(json!("Draft letter"))),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Draft letter", json!({"client": "Acme"}), true)
        .await;

    let outcome = h.engine.execute_task_automation(task.id, h.actor).await.unwrap();
    assert!(matches!(outcome, AutomationOutcome::AwaitingReview { .. }));

    let parked = h.task(task.id).await;
    assert_eq!(parked.review_status, Some(ReviewStatus::PendingReview));
    assert_eq!(parked.status, TaskStatus::InProgress);
    assert_eq!(parked.automation_output, Some(json!("Draft letter")));

    // A second run is refused while waiting.
    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let reviewer = uuid::Uuid::new_v4();
    let approval = h
        .engine
        .approve_review(task.id, reviewer, Some("Looks right".to_string()))
        .await
        .unwrap();
    assert_eq!(approval.task.status, TaskStatus::Completed);
    assert_eq!(approval.task.review_status, Some(ReviewStatus::Approved));
    assert_eq!(approval.task.reviewed_by, Some(reviewer));
    assert_eq!(approval.task.completed_by, Some(reviewer));
    assert_eq!(approval.task.review_notes.as_deref(), Some("Looks right"));
    assert!(approval.cascade.completed_workflow());
}

#[tokio::test]
async fn test_reject_then_rerun() {
    let h = Harness::new().await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Summarize", json!({"text": "..."}), true)
        .await;
    h.engine.execute_task_automation(task.id, h.actor).await.unwrap();

    let err = h.engine.reject_review(task.id, h.actor, "  ".to_string()).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let rejected = h
        .engine
        .reject_review(task.id, h.actor, "Wrong tax year".to_string())
        .await
        .unwrap();
    assert_eq!(rejected.status, TaskStatus::Pending);
    assert_eq!(rejected.review_status, Some(ReviewStatus::Rejected));
    assert_eq!(rejected.automation_output, None);
    assert_eq!(rejected.review_notes.as_deref(), Some("Wrong tax year"));

    let outcome = h.engine.execute_task_automation(task.id, h.actor).await.unwrap();
    assert!(matches!(outcome, AutomationOutcome::AwaitingReview { .. }));
    assert_eq!(h.agent.call_count().await, 2);
}

#[tokio::test]
async fn test_approve_requires_pending_review() {
    let h = Harness::new().await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Summarize", json!({"text": "..."}), true)
        .await;

    let err = h.engine.approve_review(task.id, h.actor, None).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    assert_eq!(h.task(task.id).await.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_agent_failure_resets_task() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(AGENT, MockResponse::failure("provider unavailable")),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Extract", json!({"document": "a.pdf"}), false)
        .await;

    let outcome = h.engine.execute_task_automation(task.id, h.actor).await.unwrap();
    let AutomationOutcome::Failed { task: failed, error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(error.contains("provider unavailable"));
    assert_eq!(failed.status, TaskStatus::Pending);
    assert!(failed.has_automation_error());
    assert!(!failed.ai_gate_satisfied());

    let kinds: Vec<_> = h
        .activity
        .list_for_task(task.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.kind_name())
        .collect();
    assert_eq!(kinds, vec!["automation_started", "automation_failed"]);
}

#[tokio::test]
async fn test_agent_timeout_is_reported_as_failure() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(
            AGENT,
            MockResponse::success(json!("late")).with_delay(Duration::from_millis(500)),
        ),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Extract", json!({"document": "a.pdf"}), false)
        .await;

    let outcome = h
        .engine
        .execute_task_automation_with_timeout(task.id, h.actor, Duration::from_millis(20))
        .await
        .unwrap();
    assert!(outcome.is_failed());
    assert_eq!(outcome.task().status, TaskStatus::Pending);
    assert!(outcome.task().has_automation_error());
}

#[tokio::test]
async fn test_disabled_agent_is_not_installed() {
    let h = Harness::new().await;
    h.install_agent().await;
    h.settings.set_installation(h.org, AGENT, false).await.unwrap();
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Extract", json!({"document": "a.pdf"}), false)
        .await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::NotInstalled { .. }));
    assert_eq!(h.agent.call_count().await, 0);

    let unchanged = h.task(task.id).await;
    assert_eq!(unchanged.status, TaskStatus::Pending);
    assert_eq!(unchanged.version, task.version);
    assert_eq!(unchanged.automation_output, None);
}

#[tokio::test]
async fn test_unregistered_agent_is_not_installed() {
    let h = Harness::new().await;
    h.install_agent().await;
    h.settings.set_installation(h.org, "tax-advisor", true).await.unwrap();
    let chain = h.chain().await;
    let task = h
        .insert_task(caseflow::domain::models::Task::automated(
            chain.step.id,
            "Advise",
            "Tax Advisor",
            json!({"question": "VAT?"}),
        ))
        .await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    match err {
        DomainError::NotInstalled { agent, organization_id } => {
            assert_eq!(agent, "tax-advisor");
            assert_eq!(organization_id, h.org);
        }
        other => panic!("expected NotInstalled, got {other:?}"),
    }
    assert_unchanged(&h, &task).await;
}

#[tokio::test]
async fn test_missing_llm_config_is_configuration_error() {
    let h = Harness::new().await;
    h.settings.set_installation(h.org, AGENT, true).await.unwrap();
    let chain = h.chain().await;
    let task = h
        .automated_task(chain.step.id, "Extract", json!({"document": "a.pdf"}), false)
        .await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Configuration(_)));
    assert_eq!(h.agent.call_count().await, 0);
    assert_unchanged(&h, &task).await;
}

#[tokio::test]
async fn test_manual_task_cannot_be_automated() {
    let h = Harness::new().await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h.manual_task(chain.step.id, "Phone client").await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_blank_input_is_rejected() {
    let h = Harness::new().await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h.automated_task(chain.step.id, "Extract", json!({}), false).await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.agent.call_count().await, 0);
    assert_unchanged(&h, &task).await;
}

#[tokio::test]
async fn test_missing_agent_is_rejected_without_changes() {
    let h = Harness::new().await;
    h.install_agent().await;
    let chain = h.chain().await;
    let mut task = caseflow::domain::models::Task::automated(
        chain.step.id,
        "Extract",
        AGENT,
        json!({"document": "a.pdf"}),
    );
    task.ai_agent_id = None;
    let task = h.insert_task(task).await;

    let err = h.engine.execute_task_automation(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.agent.call_count().await, 0);
    assert_unchanged(&h, &task).await;

    let started = h
        .activity
        .list_for_task(task.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.kind_name() == "automation_started")
        .count();
    assert_eq!(started, 0);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .engine
        .execute_task_automation(uuid::Uuid::new_v4(), h.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Task", .. }));
}

/// The stored task still matches what was inserted.
async fn assert_unchanged(h: &Harness, before: &caseflow::domain::models::Task) {
    let after = h.task(before.id).await;
    assert_eq!(after.status, before.status);
    assert_eq!(after.version, before.version);
    assert_eq!(after.automation_output, before.automation_output);
    assert_eq!(after.review_status, before.review_status);
}
