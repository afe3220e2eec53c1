//! Agent served over HTTP.
//!
//! The request is POSTed as JSON; the response is either `{"result": ...}` or
//! any other JSON document, which is taken as the result whole.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_agent_slug, AgentOutput, AgentRequest, HttpAgentConfig};
use crate::domain::ports::AgentAdapter;

/// Wire body sent to the agent endpoint.
#[derive(Debug, Serialize)]
struct AgentCallBody<'a> {
    task_id: Uuid,
    organization_id: Uuid,
    agent: &'a str,
    input: &'a Value,
    provider: &'a str,
    model: &'a str,
}

/// Agent adapter that posts task input to a remote JSON endpoint.
pub struct HttpAgentAdapter {
    slug: String,
    endpoint: String,
    client: Client,
}

impl HttpAgentAdapter {
    /// `timeout` bounds the whole HTTP exchange; the executor applies its own
    /// limit on top.
    pub fn new(config: &HttpAgentConfig, timeout: Duration) -> DomainResult<Self> {
        let slug = normalize_agent_slug(&config.slug);
        if slug.is_empty() {
            return Err(DomainError::Configuration("HTTP agent has an empty slug".to_string()));
        }
        if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
            return Err(DomainError::Configuration(format!(
                "HTTP agent '{slug}' has an invalid endpoint: {}",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            slug,
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// The URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AgentAdapter for HttpAgentAdapter {
    fn slug(&self) -> &str {
        &self.slug
    }

    #[tracing::instrument(
        skip(self, request),
        fields(agent = %self.slug, task_id = %request.task_id)
    )]
    async fn execute(&self, request: AgentRequest) -> DomainResult<AgentOutput> {
        let body = AgentCallBody {
            task_id: request.task_id,
            organization_id: request.organization_id,
            agent: &self.slug,
            input: &request.input,
            provider: &request.llm.provider,
            model: &request.llm.model,
        };

        let mut call = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(api_key) = request.llm.api_key.as_deref() {
            call = call.bearer_auth(api_key);
        }

        let response = call
            .send()
            .await
            .map_err(|e| DomainError::Adapter(format!("Agent request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Adapter(format!("Agent returned {status}: {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| DomainError::Adapter(format!("Failed to parse agent response: {e}")))?;

        let result = match payload {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };
        tracing::debug!("Agent call succeeded");
        Ok(AgentOutput::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_endpoint() {
        let config = HttpAgentConfig {
            slug: "summarizer".to_string(),
            endpoint: "ftp://agents.local".to_string(),
        };
        assert!(matches!(
            HttpAgentAdapter::new(&config, Duration::from_secs(5)),
            Err(DomainError::Configuration(_))
        ));
    }

    #[test]
    fn test_slug_is_normalized() {
        let config = HttpAgentConfig {
            slug: "Document Extractor".to_string(),
            endpoint: "http://localhost:9000/run".to_string(),
        };
        let adapter = HttpAgentAdapter::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(adapter.slug(), "document-extractor");
        assert_eq!(adapter.endpoint(), "http://localhost:9000/run");
    }
}
