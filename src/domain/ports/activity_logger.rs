//! Activity logger port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ActivityEvent;

/// Sink for activity events. Callers log and drop errors from `record`;
/// a failed record never undoes the state change that produced it.
#[async_trait]
pub trait ActivityLogger: Send + Sync {
    async fn record(&self, event: ActivityEvent) -> DomainResult<()>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullActivityLogger;

#[async_trait]
impl ActivityLogger for NullActivityLogger {
    async fn record(&self, _event: ActivityEvent) -> DomainResult<()> {
        Ok(())
    }
}
