//! Workflow templates loaded from YAML.

pub mod workflow_loader;

pub use workflow_loader::{WorkflowLoader, WorkflowPlan, WorkflowTemplate};
