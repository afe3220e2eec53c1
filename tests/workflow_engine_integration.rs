//! End-to-end tests for the workflow engine facade.

mod common;

use serde_json::json;

use caseflow::adapters::agents::{MockAgent, MockResponse};
use caseflow::domain::errors::DomainError;
use caseflow::domain::models::{
    ActionKind, AutomationAction, Condition, ConditionOperator, Task, TaskStatus, UnitStatus,
    WorkflowStatus,
};
use caseflow::infrastructure::templates::WorkflowLoader;
use caseflow::services::{ActionRunStatus, EngineSettings, HierarchyNode};
use common::{Harness, AGENT};

fn notify_partner() -> AutomationAction {
    AutomationAction::new(ActionKind::CreateNotification {
        user_id: None,
        title: "Large refund for {{client}}".to_string(),
        body: "Amount {{amount}}".to_string(),
    })
    .named("notify")
}

#[tokio::test]
async fn test_action_run_completes_task_and_cascades() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let mut task = Task::new(chain.step.id, "Flag large refunds")
        .with_conditions(vec![Condition::compare(
            "amount",
            ConditionOperator::GreaterThan,
            json!(1000),
        )])
        .with_actions(vec![notify_partner()]);
    task.automation_input = Some(json!({"amount": 2500, "client": "Acme"}));
    let task = h.insert_task(task).await;

    let run = h.engine.run_task_actions(task.id, h.actor).await.unwrap();
    assert_eq!(run.status, ActionRunStatus::Completed);
    assert_eq!(run.task.status, TaskStatus::Completed);
    assert_eq!(run.task.completed_by, Some(h.actor));
    assert!(run.cascade.completed_workflow());
    assert!(run.data["outputs"]["notify"]["notification_id"].is_string());

    let notifications = h.gateway.list_notifications(h.actor).await.unwrap();
    assert_eq!(notifications[0].title, "Large refund for Acme");
    assert_eq!(notifications[0].body, "Amount 2500");
}

#[tokio::test]
async fn test_action_run_with_unmet_conditions_changes_nothing() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let mut task = Task::new(chain.step.id, "Flag large refunds")
        .with_conditions(vec![Condition::compare(
            "amount",
            ConditionOperator::GreaterThan,
            json!(1000),
        )])
        .with_actions(vec![notify_partner()]);
    task.automation_input = Some(json!({"amount": 20}));
    let task = h.insert_task(task).await;

    let run = h.engine.run_task_actions(task.id, h.actor).await.unwrap();
    assert_eq!(run.status, ActionRunStatus::ConditionsNotMet);
    assert!(run.results.is_empty());

    let stored = h.task(task.id).await;
    assert_eq!(stored.status, TaskStatus::Pending);
    assert_eq!(stored.version, task.version);
    assert!(h.gateway.list_notifications(h.actor).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_action_leaves_task_in_progress() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let task = h
        .insert_task(Task::new(chain.step.id, "Chase documents").with_actions(vec![
            notify_partner(),
            AutomationAction::new(ActionKind::SendMessage {
                recipient: "{{client_email}}".to_string(),
                channel: "email".to_string(),
                subject: None,
                body: "Please send your P60".to_string(),
            }),
        ]))
        .await;

    let run = h.engine.run_task_actions(task.id, h.actor).await.unwrap();
    assert_eq!(run.status, ActionRunStatus::NeedsFollowUp);
    assert_eq!(run.task.status, TaskStatus::InProgress);
    assert!(run.results[0].success);
    assert!(!run.results[1].success);
    assert!(run.cascade.is_noop());

    // Rerunning from in-progress is allowed.
    let again = h.engine.run_task_actions(task.id, h.actor).await.unwrap();
    assert_eq!(again.status, ActionRunStatus::NeedsFollowUp);

    let events = h.activity.list_for_task(task.id).await.unwrap();
    assert_eq!(events.iter().filter(|e| e.kind_name() == "actions_executed").count(), 2);
}

#[tokio::test]
async fn test_action_limit_is_checked_first() {
    let h = Harness::with_agent(
        MockAgent::new(AGENT),
        EngineSettings {
            max_actions: 1,
            ..EngineSettings::default()
        },
    )
    .await;
    let chain = h.chain().await;
    let task = h
        .insert_task(
            Task::new(chain.step.id, "Too busy")
                .with_actions(vec![notify_partner(), notify_partner()]),
        )
        .await;

    let err = h.engine.run_task_actions(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(h.task(task.id).await.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_completed_task_rejects_action_run() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let task = h.manual_task(chain.step.id, "Done already").await;
    h.engine.complete_task(task.id, h.actor).await.unwrap();

    let err = h.engine.run_task_actions(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[tokio::test]
async fn test_action_run_respects_review_gate() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(
            AGENT,
            MockResponse::success(json!({"draft": "Dear client"})),
        ),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;
    let chain = h.chain().await;
    let task = h
        .insert_task(
            Task::automated(chain.step.id, "Draft letter", AGENT, json!({"client": "Acme"}))
                .with_review_required(true)
                .with_actions(vec![notify_partner()]),
        )
        .await;

    // Not run yet: there is no accepted output to act on.
    let err = h.engine.run_task_actions(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    h.engine.execute_task_automation(task.id, h.actor).await.unwrap();
    let parked = h.task(task.id).await;

    let err = h.engine.run_task_actions(task.id, h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    let unchanged = h.task(task.id).await;
    assert_eq!(unchanged.status, TaskStatus::InProgress);
    assert_eq!(unchanged.review_status, parked.review_status);
    assert_eq!(unchanged.version, parked.version);
    assert_eq!(h.step_of(chain.step.id).await.status, UnitStatus::Pending);
    assert_eq!(h.workflow_of(chain.workflow.id).await.status, WorkflowStatus::Active);
}

#[tokio::test]
async fn test_complete_task_twice_keeps_first_completer() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let task = h.manual_task(chain.step.id, "File return").await;
    let second_actor = uuid::Uuid::new_v4();

    h.engine.complete_task(task.id, h.actor).await.unwrap();
    let again = h.engine.complete_task(task.id, second_actor).await.unwrap();
    assert_eq!(again.task.completed_by, Some(h.actor));
    assert!(again.cascade.is_noop());
}

#[tokio::test]
async fn test_assign_and_unassign() {
    let h = Harness::new().await;
    let chain = h.chain().await;
    let task = h.manual_task(chain.step.id, "Prepare VAT return").await;
    let user = uuid::Uuid::new_v4();

    let assigned = h.engine.assign_task(task.id, Some(user)).await.unwrap();
    assert_eq!(assigned.assigned_to, Some(user));
    assert_eq!(assigned.status, TaskStatus::Pending);

    let cleared = h.engine.assign_task(task.id, None).await.unwrap();
    assert_eq!(cleared.assigned_to, None);

    let err = h.engine.assign_task(uuid::Uuid::new_v4(), None).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_unknown_units_are_not_found() {
    let h = Harness::new().await;
    let err = h
        .engine
        .toggle_checklist_item(uuid::Uuid::new_v4(), h.actor, true)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "ChecklistItem", .. }));

    let err = h.engine.complete_subtask(uuid::Uuid::new_v4(), h.actor).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Subtask", .. }));
}

#[tokio::test]
async fn test_progress_report_counts_levels() {
    let h = Harness::new().await;
    let workflow = h.workflow("Year end").await;
    let stage = h.stage(workflow.id, 0).await;
    let step_a = h.step(stage.id, 0).await;
    let step_b = h.step(stage.id, 1).await;
    let a = h.manual_task(step_a.id, "A").await;
    h.manual_task(step_b.id, "B").await;
    h.manual_task(step_b.id, "C").await;

    h.engine.complete_task(a.id, h.actor).await.unwrap();

    let report = h.engine.progress_report(workflow.id).await.unwrap();
    assert_eq!(report.workflow.id, workflow.id);
    assert_eq!(report.summary.stages_total, 1);
    assert_eq!(report.summary.stages_completed, 0);
    assert_eq!(report.summary.steps_total, 2);
    assert_eq!(report.summary.steps_completed, 1);
    assert_eq!(report.summary.tasks_total, 3);
    assert_eq!(report.summary.tasks_completed, 1);

    let err = h.engine.progress_report(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound { entity: "Workflow", .. }));
}

const BOOKKEEPING: &str = r#"
name: Monthly bookkeeping
stages:
  - name: Collect
    steps:
      - name: Statements
        tasks:
          - title: Upload statements
            checklist:
              - Current account
              - title: Savings account
                required: false
          - title: Categorize transactions
            type: automated
            agent: document-extractor
            input:
              prompt: "Categorize the uploaded statements"
            review_required: true
  - name: Report
    steps:
      - name: Send
        tasks:
          - title: Email summary
            actions:
              - type: send_message
                name: summary
                recipient: "client@acme.test"
                body: "Your books for the month are ready"
"#;

#[tokio::test]
async fn test_imported_workflow_runs_to_completion() {
    let h = Harness::with_agent(
        MockAgent::with_default_response(AGENT, MockResponse::success(json!({"categorized": 42}))),
        EngineSettings::default(),
    )
    .await;
    h.install_agent().await;

    let template = WorkflowLoader::load_from_yaml(BOOKKEEPING).unwrap();
    let plan = WorkflowLoader::instantiate(&template, h.org).unwrap();
    plan.persist(&h.store).await.unwrap();

    let upload = &plan.tasks[0];
    let categorize = &plan.tasks[1];
    let email = &plan.tasks[2];

    let update = h
        .engine
        .toggle_checklist_item(plan.checklist_items[0].id, h.actor, true)
        .await
        .unwrap();
    assert_eq!(update.cascade.completed, vec![HierarchyNode::Task(upload.id)]);

    h.engine.execute_task_automation(categorize.id, h.actor).await.unwrap();
    let approval = h.engine.approve_review(categorize.id, h.actor, None).await.unwrap();
    assert_eq!(
        approval.cascade.completed,
        vec![HierarchyNode::Step(plan.steps[0].id), HierarchyNode::Stage(plan.stages[0].id)]
    );
    assert_eq!(h.workflow_of(plan.workflow.id).await.status, WorkflowStatus::Active);

    let run = h.engine.run_task_actions(email.id, h.actor).await.unwrap();
    assert_eq!(run.status, ActionRunStatus::Completed);
    assert!(run.cascade.completed_workflow());

    let report = h.engine.progress_report(plan.workflow.id).await.unwrap();
    assert_eq!(report.workflow.status, WorkflowStatus::Completed);
    assert_eq!(report.summary.tasks_completed, 3);
    assert_eq!(h.stage_of(plan.stages[1].id).await.status, UnitStatus::Completed);
}
