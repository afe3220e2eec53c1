//! HTTP agent adapter against a mock server, directly and through the engine.

use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use caseflow::adapters::agents::HttpAgentAdapter;
use caseflow::adapters::sqlite::create_migrated_test_pool;
use caseflow::cli::AppContext;
use caseflow::domain::errors::DomainError;
use caseflow::domain::models::{
    AgentRequest, Config, HttpAgentConfig, LlmConfig, Stage, Step, Task, TaskStatus, Workflow,
};
use caseflow::domain::ports::AgentAdapter;
use caseflow::services::AutomationOutcome;

fn llm(api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        name: "default".to_string(),
        provider: "anthropic".to_string(),
        model: "claude-sonnet".to_string(),
        api_key: api_key.map(str::to_string),
    }
}

fn request(api_key: Option<&str>) -> AgentRequest {
    AgentRequest {
        task_id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        agent: "summarizer".to_string(),
        input: json!({"text": "Quarterly figures"}),
        llm: llm(api_key),
    }
}

fn adapter(endpoint: String) -> HttpAgentAdapter {
    HttpAgentAdapter::new(
        &HttpAgentConfig {
            slug: "summarizer".to_string(),
            endpoint,
        },
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_posts_request_and_unwraps_result() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/agents/summarize")
        .match_header("authorization", "Bearer secret-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "agent": "summarizer",
            "input": {"text": "Quarterly figures"},
            "provider": "anthropic",
            "model": "claude-sonnet"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"result": {"summary": "Revenue up"}, "usage": {"tokens": 12}}).to_string(),
        )
        .create_async()
        .await;

    let agent = adapter(format!("{}/agents/summarize", server.url()));
    let output = agent.execute(request(Some("secret-key"))).await.unwrap();

    assert_eq!(output.result, json!({"summary": "Revenue up"}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_body_without_result_is_taken_whole() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/run")
        .with_status(200)
        .with_body(json!(["a", "b"]).to_string())
        .create_async()
        .await;

    let output = adapter(format!("{}/run", server.url()))
        .execute(request(None))
        .await
        .unwrap();
    assert_eq!(output.result, json!(["a", "b"]));
}

#[tokio::test]
async fn test_server_error_is_adapter_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/run")
        .with_status(500)
        .with_body("model overloaded")
        .create_async()
        .await;

    let err = adapter(format!("{}/run", server.url()))
        .execute(request(None))
        .await
        .unwrap_err();
    match err {
        DomainError::Adapter(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("model overloaded"));
        }
        other => panic!("expected adapter error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_json_is_adapter_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/run")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = adapter(format!("{}/run", server.url()))
        .execute(request(None))
        .await
        .unwrap_err();
    assert!(err.is_adapter_failure());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_adapter_failure() {
    let err = adapter("http://127.0.0.1:1/run".to_string())
        .execute(request(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Adapter(_)));
}

#[tokio::test]
async fn test_configured_http_agent_runs_through_engine() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/extract")
        .match_header("authorization", "Bearer org-key")
        .with_status(200)
        .with_body(json!({"result": {"tax_id": "GB123"}}).to_string())
        .create_async()
        .await;

    let mut config = Config::default();
    config.agents.http.push(HttpAgentConfig {
        slug: "Document Extractor".to_string(),
        endpoint: format!("{}/extract", server.url()),
    });
    let pool = create_migrated_test_pool().await.unwrap();
    let ctx = AppContext::from_pool(config, pool).unwrap();
    assert!(ctx.registry.contains("document-extractor"));

    let org = Uuid::new_v4();
    let actor = Uuid::new_v4();
    ctx.settings.set_installation(org, "document-extractor", true).await.unwrap();
    ctx.settings.upsert_llm_config(org, &llm(Some("org-key")), true).await.unwrap();

    let workflow = Workflow::new(org, "Onboarding");
    let stage = Stage::new(workflow.id, "Intake", 0);
    let step = Step::new(stage.id, "Identify", 0);
    let task = Task::automated(
        step.id,
        "Extract tax id",
        "document-extractor",
        json!({"doc": "id.pdf"}),
    );
    ctx.store.insert_workflow(&workflow).await.unwrap();
    ctx.store.insert_stage(&stage).await.unwrap();
    ctx.store.insert_step(&step).await.unwrap();
    ctx.store.insert_task(&task).await.unwrap();

    let outcome = ctx.engine.execute_task_automation(task.id, actor).await.unwrap();
    let AutomationOutcome::Completed { task: done, cascade } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.automation_output, Some(json!({"tax_id": "GB123"})));
    assert!(cascade.completed_workflow());
    mock.assert_async().await;
}
