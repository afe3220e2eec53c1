//! Integration tests for action execution against the SQLite gateway.

mod common;

use serde_json::{json, Map, Value};

use caseflow::domain::errors::DomainError;
use caseflow::domain::models::{
    ActionKind, AutomationAction, Condition, ConditionOperator, ExecutionContext,
};
use caseflow::domain::ports::HierarchyStore;
use caseflow::services::hierarchy::load_lineage;
use caseflow::services::workflow_engine::execution_context;
use caseflow::services::AutomationEngine;
use common::Harness;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

async fn context_for(h: &Harness, input: Value) -> (ExecutionContext, uuid::Uuid) {
    let chain = h.chain().await;
    let mut task = caseflow::domain::models::Task::new(chain.step.id, "Send reminder");
    task.automation_input = Some(input);
    let task = h.insert_task(task).await;
    let lineage = load_lineage(h.store.as_ref(), task.id).await.unwrap();
    (execution_context(&lineage, h.actor), task.id)
}

#[tokio::test]
async fn test_actions_share_context_and_named_outputs() {
    let h = Harness::new().await;
    let engine = AutomationEngine::new(h.gateway.clone(), 10);
    let (mut ctx, task_id) =
        context_for(&h, json!({"client": {"name": "Acme", "email": "ops@acme.test"}})).await;

    let actions = vec![
        AutomationAction::new(ActionKind::CreateTask {
            title: "Follow up with {{client.name}}".to_string(),
            description: String::new(),
            step_id: None,
            assigned_to: None,
        })
        .named("followup"),
        AutomationAction::new(ActionKind::SetField {
            field: "reminder.subject".to_string(),
            value: json!("Documents for {{client.name}}"),
        }),
        AutomationAction::new(ActionKind::SendMessage {
            recipient: "{{client.email}}".to_string(),
            channel: "email".to_string(),
            subject: Some("{{reminder.subject}}".to_string()),
            body: "Follow-up task {{outputs.followup.task_id}}".to_string(),
        }),
        AutomationAction::new(ActionKind::CreateNotification {
            user_id: None,
            title: "Reminder sent to {{client.name}}".to_string(),
            body: String::new(),
        }),
    ];

    let results = engine.execute_actions(&actions, &mut ctx).await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.success && !r.skipped));
    assert_eq!(results[0].action, "followup");

    let created_id = ctx.data["outputs"]["followup"]["task_id"].as_str().unwrap().to_string();
    let created = h
        .store
        .get_task(created_id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.title, "Follow up with Acme");
    assert_eq!(created.order, 1);

    let messages = h.gateway.list_messages(task_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].recipient, "ops@acme.test");
    assert_eq!(messages[0].subject.as_deref(), Some("Documents for Acme"));
    assert_eq!(messages[0].body, format!("Follow-up task {created_id}"));
    assert_eq!(messages[0].status, "queued");

    let notifications = h.gateway.list_notifications(h.actor).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Reminder sent to Acme");
    assert_eq!(notifications[0].task_id, Some(task_id));
}

#[tokio::test]
async fn test_failure_does_not_stop_later_actions() {
    let h = Harness::new().await;
    let engine = AutomationEngine::new(h.gateway.clone(), 10);
    let (mut ctx, task_id) = context_for(&h, json!({"email": "a@b.test"})).await;

    let actions = vec![
        AutomationAction::new(ActionKind::UpdateTask {
            task_id: None,
            fields: object(json!({"status": "completed"})),
        }),
        AutomationAction::new(ActionKind::SendMessage {
            recipient: "{{missing}}".to_string(),
            channel: "email".to_string(),
            subject: None,
            body: "Hello".to_string(),
        }),
        AutomationAction::new(ActionKind::UpdateTask {
            task_id: None,
            fields: object(json!({"description": "Sent to {{email}}"})),
        }),
    ];

    let results = engine.execute_actions(&actions, &mut ctx).await.unwrap();
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("status"));
    assert!(!results[1].success);
    assert!(results[2].success);

    let task = h.store.get_task(task_id).await.unwrap().unwrap();
    assert!(!task.is_completed());
    assert_eq!(task.description, "Sent to a@b.test");
    assert_eq!(task.version, 1);
}

#[tokio::test]
async fn test_action_conditions_see_earlier_writes() {
    let h = Harness::new().await;
    let engine = AutomationEngine::new(h.gateway.clone(), 10);
    let (mut ctx, task_id) = context_for(&h, json!({"amount": 500})).await;

    let escalate = vec![Condition::compare("escalate", ConditionOperator::Equals, json!(true))];
    let actions = vec![
        AutomationAction::new(ActionKind::SendMessage {
            recipient: "partner@firm.test".to_string(),
            channel: "email".to_string(),
            subject: None,
            body: "Escalation".to_string(),
        })
        .when(escalate.clone()),
        AutomationAction::new(ActionKind::SetField {
            field: "escalate".to_string(),
            value: json!(true),
        })
        .when(vec![Condition::compare("amount", ConditionOperator::GreaterThan, json!(100))]),
        AutomationAction::new(ActionKind::SendMessage {
            recipient: "partner@firm.test".to_string(),
            channel: "email".to_string(),
            subject: None,
            body: "Escalation".to_string(),
        })
        .when(escalate),
    ];

    let results = engine.execute_actions(&actions, &mut ctx).await.unwrap();
    assert!(results[0].skipped && results[0].success);
    assert!(!results[1].skipped);
    assert!(!results[2].skipped);
    assert_eq!(h.gateway.list_messages(task_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_too_many_actions_is_rejected_before_running() {
    let h = Harness::new().await;
    let engine = AutomationEngine::new(h.gateway.clone(), 1);
    let (mut ctx, task_id) = context_for(&h, json!({"x": 1})).await;

    let message = AutomationAction::new(ActionKind::SendMessage {
        recipient: "a@b.test".to_string(),
        channel: "sms".to_string(),
        subject: None,
        body: "Hi".to_string(),
    });
    let err = engine
        .execute_actions(&[message.clone(), message], &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert!(h.gateway.list_messages(task_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_task_in_missing_step_fails() {
    let h = Harness::new().await;
    let engine = AutomationEngine::new(h.gateway.clone(), 10);
    let (mut ctx, _) = context_for(&h, json!({"x": 1})).await;

    let actions = vec![AutomationAction::new(ActionKind::CreateTask {
        title: "Orphan".to_string(),
        description: String::new(),
        step_id: Some(uuid::Uuid::new_v4()),
        assigned_to: None,
    })];
    let results = engine.execute_actions(&actions, &mut ctx).await.unwrap();
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap().contains("not found"));
}
