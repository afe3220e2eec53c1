//! Port trait definitions (Hexagonal Architecture)
//!
//! The engine talks to its collaborators only through these traits:
//! - HierarchyStore: workflow/stage/step/task persistence and conditional completion
//! - AgentAdapter: a pluggable AI worker
//! - AgentInstallations / LlmConfigProvider: organization-level agent setup
//! - ActivityLogger: fire-and-forget activity sink
//! - AutomationGateway: side effects performed by automation actions

pub mod activity_logger;
pub mod agent_adapter;
pub mod automation_gateway;
pub mod hierarchy_store;

pub use activity_logger::{ActivityLogger, NullActivityLogger};
pub use agent_adapter::{AgentAdapter, AgentInstallations, LlmConfigProvider};
pub use automation_gateway::{AutomationGateway, NewNotification, NewTask, OutgoingMessage};
pub use hierarchy_store::HierarchyStore;
