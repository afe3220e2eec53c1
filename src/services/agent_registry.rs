//! Registry of agent adapters, resolved by slug.
//!
//! Built once at startup; lookups normalize the requested identifier the
//! same way registration does.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::normalize_agent_slug;
use crate::domain::ports::AgentAdapter;

/// Agent adapters keyed by slug.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    adapters: HashMap<String, Arc<dyn AgentAdapter>>,
}

impl AgentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its normalized slug.
    ///
    /// A second adapter for the same slug is a configuration error.
    pub fn register(&mut self, adapter: Arc<dyn AgentAdapter>) -> DomainResult<()> {
        let slug = normalize_agent_slug(adapter.slug());
        if slug.is_empty() {
            return Err(DomainError::Configuration(
                "Agent adapter has an empty slug".to_string(),
            ));
        }
        if self.adapters.contains_key(&slug) {
            return Err(DomainError::Configuration(format!(
                "Agent '{slug}' is registered twice"
            )));
        }
        tracing::debug!(agent = %slug, "Registered agent adapter");
        self.adapters.insert(slug, adapter);
        Ok(())
    }

    /// Builder form of `register`.
    pub fn with_adapter(mut self, adapter: Arc<dyn AgentAdapter>) -> DomainResult<Self> {
        self.register(adapter)?;
        Ok(self)
    }

    /// The adapter for `agent`, if registered.
    pub fn resolve(&self, agent: &str) -> Option<Arc<dyn AgentAdapter>> {
        self.adapters.get(&normalize_agent_slug(agent)).cloned()
    }

    /// Whether `agent` is registered.
    pub fn contains(&self, agent: &str) -> bool {
        self.adapters.contains_key(&normalize_agent_slug(agent))
    }

    /// Registered slugs, sorted.
    pub fn slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.adapters.keys().cloned().collect();
        slugs.sort();
        slugs
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.slugs())
            .finish()
    }
}
