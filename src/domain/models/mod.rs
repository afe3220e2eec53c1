//! Domain models for the workflow hierarchy, automation and agents.

pub mod activity;
pub mod agent;
pub mod automation;
pub mod config;
pub mod task;
pub mod workflow;

pub use activity::{ActivityEvent, ActivityKind};
pub use agent::{normalize_agent_slug, AgentOutput, AgentRequest, LlmConfig};
pub use automation::{
    all_succeeded, ActionKind, ActionResult, AutomationAction, Condition, ConditionOperator,
    ExecutionContext, LogicalOperator,
};
pub use config::{
    AgentsConfig, AutomationConfig, Config, DatabaseConfig, HttpAgentConfig, LoggingConfig,
};
pub use task::{
    is_blank_value, ChecklistItem, ReviewStatus, Subtask, Task, TaskStatus, TaskType,
};
pub use workflow::{ProgressSummary, Stage, Step, UnitStatus, Workflow, WorkflowStatus};
