//! Agent invocation types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Credentials and model selection for an organization's LLM provider.
///
/// Opaque to the engine; passed through to the agent adapter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub name: String,
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl LlmConfig {
    /// Usable means a provider and model are set.
    pub fn is_usable(&self) -> bool {
        !self.provider.trim().is_empty() && !self.model.trim().is_empty()
    }
}

/// Input handed to an agent adapter.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub task_id: Uuid,
    pub organization_id: Uuid,
    pub agent: String,
    pub input: Value,
    #[serde(skip)]
    pub llm: LlmConfig,
}

/// Raw result returned by an agent adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub result: Value,
}

impl AgentOutput {
    /// Wrap a successful agent result.
    pub fn new(result: Value) -> Self {
        Self { result }
    }
}

/// Normalize an agent identifier: trimmed, lowercase, with spaces and
/// underscores folded to `-`.
pub fn normalize_agent_slug(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}
