//! Agent adapters.

pub mod http;
pub mod mock;

pub use http::HttpAgentAdapter;
pub use mock::{MockAgent, MockResponse};

use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::AgentsConfig;
use crate::services::AgentRegistry;

/// Build the registry from the configured HTTP agents.
pub fn build_registry(config: &AgentsConfig) -> DomainResult<AgentRegistry> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut registry = AgentRegistry::new();
    for agent in &config.http {
        registry.register(Arc::new(HttpAgentAdapter::new(agent, timeout)?))?;
    }
    Ok(registry)
}
