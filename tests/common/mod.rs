//! Common test utilities for integration tests
//!
//! Builds a [`WorkflowEngine`] over a migrated in-memory database with a
//! [`MockAgent`] registered, plus helpers to seed the hierarchy.

#![allow(dead_code)]

use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use caseflow::adapters::agents::MockAgent;
use caseflow::adapters::sqlite::{
    create_migrated_test_pool, SqliteActivityLog, SqliteAutomationGateway, SqliteHierarchyStore,
    SqliteOrganizationSettings,
};
use caseflow::domain::models::{ChecklistItem, LlmConfig, Stage, Step, Subtask, Task, Workflow};
use caseflow::domain::ports::HierarchyStore;
use caseflow::services::{
    AgentRegistry, EngineDependencies, EngineSettings, EventBus, EventBusConfig, WorkflowEngine,
};

pub const AGENT: &str = "document-extractor";

pub struct Harness {
    pub pool: SqlitePool,
    pub store: Arc<SqliteHierarchyStore>,
    pub settings: Arc<SqliteOrganizationSettings>,
    pub gateway: Arc<SqliteAutomationGateway>,
    pub activity: Arc<SqliteActivityLog>,
    pub agent: Arc<MockAgent>,
    pub engine: WorkflowEngine,
    pub org: Uuid,
    pub actor: Uuid,
}

/// A workflow with one stage holding one step.
pub struct Chain {
    pub workflow: Workflow,
    pub stage: Stage,
    pub step: Step,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_agent(MockAgent::new(AGENT), EngineSettings::default()).await
    }

    pub async fn with_agent(agent: MockAgent, settings: EngineSettings) -> Self {
        let pool = create_migrated_test_pool().await.unwrap();
        Self::on_pool(pool, agent, settings)
    }

    pub fn on_pool(pool: SqlitePool, agent: MockAgent, settings: EngineSettings) -> Self {
        let store = Arc::new(SqliteHierarchyStore::new(pool.clone()));
        let org_settings = Arc::new(SqliteOrganizationSettings::new(pool.clone()));
        let gateway = Arc::new(SqliteAutomationGateway::new(pool.clone()));
        let activity = Arc::new(SqliteActivityLog::new(pool.clone()));
        let agent = Arc::new(agent);

        let mut registry = AgentRegistry::new();
        registry.register(agent.clone()).unwrap();

        let bus = EventBus::new(EventBusConfig::default()).with_sink(activity.clone());
        let engine = WorkflowEngine::new(
            EngineDependencies {
                store: store.clone(),
                activity: Arc::new(bus),
                registry: Arc::new(registry),
                installations: org_settings.clone(),
                llm_configs: org_settings.clone(),
                gateway: gateway.clone(),
            },
            settings,
        );

        Self {
            pool,
            store,
            settings: org_settings,
            gateway,
            activity,
            agent,
            engine,
            org: Uuid::new_v4(),
            actor: Uuid::new_v4(),
        }
    }

    /// Enable the mock agent and give the organization a default LLM config.
    pub async fn install_agent(&self) {
        self.settings.set_installation(self.org, AGENT, true).await.unwrap();
        self.settings
            .upsert_llm_config(
                self.org,
                &LlmConfig {
                    name: "default".to_string(),
                    provider: "anthropic".to_string(),
                    model: "claude-sonnet".to_string(),
                    api_key: Some("test-key".to_string()),
                },
                true,
            )
            .await
            .unwrap();
    }

    pub async fn workflow(&self, name: &str) -> Workflow {
        let workflow = Workflow::new(self.org, name);
        self.store.insert_workflow(&workflow).await.unwrap();
        workflow
    }

    pub async fn stage(&self, workflow_id: Uuid, order: i32) -> Stage {
        let stage = Stage::new(workflow_id, format!("Stage {order}"), order);
        self.store.insert_stage(&stage).await.unwrap();
        stage
    }

    pub async fn step(&self, stage_id: Uuid, order: i32) -> Step {
        let step = Step::new(stage_id, format!("Step {order}"), order);
        self.store.insert_step(&step).await.unwrap();
        step
    }

    pub async fn chain(&self) -> Chain {
        let workflow = self.workflow("Annual accounts").await;
        let stage = self.stage(workflow.id, 0).await;
        let step = self.step(stage.id, 0).await;
        Chain {
            workflow,
            stage,
            step,
        }
    }

    pub async fn manual_task(&self, step_id: Uuid, title: &str) -> Task {
        self.insert_task(Task::new(step_id, title)).await
    }

    pub async fn automated_task(
        &self,
        step_id: Uuid,
        title: &str,
        input: Value,
        review: bool,
    ) -> Task {
        self.insert_task(Task::automated(step_id, title, AGENT, input).with_review_required(review))
            .await
    }

    pub async fn insert_task(&self, task: Task) -> Task {
        self.store.insert_task(&task).await.unwrap();
        task
    }

    pub async fn subtask(&self, task_id: Uuid, title: &str, required: bool) -> Subtask {
        let mut subtask = Subtask::new(task_id, title);
        subtask.required = required;
        self.store.insert_subtask(&subtask).await.unwrap();
        subtask
    }

    pub async fn checklist_item(
        &self,
        task_id: Uuid,
        label: &str,
        required: bool,
    ) -> ChecklistItem {
        let mut item = ChecklistItem::new(task_id, label);
        item.required = required;
        self.store.insert_checklist_item(&item).await.unwrap();
        item
    }

    pub async fn task(&self, id: Uuid) -> Task {
        self.store.get_task(id).await.unwrap().unwrap()
    }

    pub async fn step_of(&self, id: Uuid) -> Step {
        self.store.get_step(id).await.unwrap().unwrap()
    }

    pub async fn stage_of(&self, id: Uuid) -> Stage {
        self.store.get_stage(id).await.unwrap().unwrap()
    }

    pub async fn workflow_of(&self, id: Uuid) -> Workflow {
        self.store.get_workflow(id).await.unwrap().unwrap()
    }
}
