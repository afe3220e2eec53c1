//! EventBus service for activity event distribution.
//!
//! Forwards engine activity to a durable sink. Sink failures never reach
//! the operation that produced the event.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::ActivityEvent;
use crate::domain::ports::ActivityLogger;

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Whether to forward events to the persistent sink.
    pub persist_events: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            persist_events: true,
        }
    }
}

/// Activity logger handed to the services. Wraps an optional sink such as
/// the SQLite activity log.
pub struct EventBus {
    sink: Option<Arc<dyn ActivityLogger>>,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a bus with no sink attached.
    pub fn new(config: EventBusConfig) -> Self {
        Self { sink: None, config }
    }

    /// Add a durable sink such as the SQLite activity log.
    pub fn with_sink(mut self, sink: Arc<dyn ActivityLogger>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Publish an event. Sink failures are logged and dropped.
    pub async fn publish(&self, event: ActivityEvent) {
        if !self.config.persist_events {
            return;
        }
        if let Some(ref sink) = self.sink {
            let name = event.kind_name();
            if let Err(e) = sink.record(event).await {
                tracing::warn!(event = name, error = %e, "Failed to persist activity event");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

#[async_trait]
impl ActivityLogger for EventBus {
    async fn record(&self, event: ActivityEvent) -> DomainResult<()> {
        self.publish(event).await;
        Ok(())
    }
}

/// Record an event, logging instead of propagating a failure.
pub(crate) async fn emit(logger: &dyn ActivityLogger, event: ActivityEvent) {
    let name = event.kind_name();
    if let Err(e) = logger.record(event).await {
        tracing::warn!(event = name, error = %e, "Activity logger failed");
    }
}
