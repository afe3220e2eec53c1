//! Agent ports: the adapter itself and the organization-level setup it needs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentOutput, AgentRequest, LlmConfig};

/// A pluggable AI worker.
///
/// Adapters are registered once at startup under their slug. Failures are
/// reported as `DomainError::Adapter`; the executor applies the timeout.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Identifier tasks reference in `ai_agent_id`.
    fn slug(&self) -> &str;

    async fn execute(&self, request: AgentRequest) -> DomainResult<AgentOutput>;
}

/// Whether an agent is installed and enabled for an organization.
#[async_trait]
pub trait AgentInstallations: Send + Sync {
    async fn is_enabled(&self, organization_id: Uuid, agent_slug: &str) -> DomainResult<bool>;
}

/// Resolves the LLM configuration an agent run should use.
#[async_trait]
pub trait LlmConfigProvider: Send + Sync {
    /// The named configuration when `preferred` is given, else the organization default.
    async fn resolve(
        &self,
        organization_id: Uuid,
        preferred: Option<&str>,
    ) -> DomainResult<Option<LlmConfig>>;
}
