//! Mock agent for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentOutput, AgentRequest};
use crate::domain::ports::AgentAdapter;

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Result handed back on success
    pub result: Value,
    /// Whether to simulate failure
    pub fail: bool,
    /// Error message if failing
    pub error_message: Option<String>,
    /// Simulated latency before answering
    pub delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            result: Value::String("Mock agent completed successfully.".to_string()),
            fail: false,
            error_message: None,
            delay: None,
        }
    }
}

impl MockResponse {
    /// A response that returns `result`.
    pub fn success(result: Value) -> Self {
        Self {
            result,
            ..Default::default()
        }
    }

    /// A response that fails with `error`.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Agent that answers from canned responses and records every request.
pub struct MockAgent {
    slug: String,
    default_response: MockResponse,
    response_overrides: Arc<RwLock<HashMap<Uuid, MockResponse>>>,
    requests: Arc<RwLock<Vec<AgentRequest>>>,
}

impl MockAgent {
    /// Create a mock that succeeds with a fixed message.
    pub fn new(slug: impl Into<String>) -> Self {
        Self::with_default_response(slug, MockResponse::default())
    }

    /// Create a mock that always answers with `response`.
    pub fn with_default_response(slug: impl Into<String>, response: MockResponse) -> Self {
        Self {
            slug: slug.into(),
            default_response: response,
            response_overrides: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set a specific response for a task ID.
    pub async fn set_response_for_task(&self, task_id: Uuid, response: MockResponse) {
        self.response_overrides.write().await.insert(task_id, response);
    }

    async fn get_response(&self, task_id: Uuid) -> MockResponse {
        let overrides = self.response_overrides.read().await;
        overrides
            .get(&task_id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<AgentRequest> {
        self.requests.read().await.clone()
    }

    /// Number of times `execute` has been called.
    pub async fn call_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl AgentAdapter for MockAgent {
    fn slug(&self) -> &str {
        &self.slug
    }

    async fn execute(&self, request: AgentRequest) -> DomainResult<AgentOutput> {
        let response = self.get_response(request.task_id).await;
        self.requests.write().await.push(request);

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        if response.fail {
            return Err(DomainError::Adapter(
                response
                    .error_message
                    .unwrap_or_else(|| "Mock failure".to_string()),
            ));
        }
        Ok(AgentOutput::new(response.result))
    }
}
