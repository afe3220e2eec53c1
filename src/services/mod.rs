//! Engine services.

pub mod agent_executor;
pub mod agent_registry;
pub mod auto_progression;
pub mod automation_engine;
pub mod event_bus;
pub mod hierarchy;
pub mod task_state_machine;
pub mod workflow_engine;

pub use agent_executor::{AgentExecutor, AutomationOutcome, ReviewApproval};
pub use agent_registry::AgentRegistry;
pub use auto_progression::{AutoProgressionEngine, CascadeReport, HierarchyNode};
pub use automation_engine::{
    evaluate_condition, evaluate_conditions, interpolate, interpolate_value, AutomationEngine,
    FieldSource,
};
pub use event_bus::{EventBus, EventBusConfig};
pub use hierarchy::{load_lineage, progress_summary, TaskLineage};
pub use task_state_machine::{Completion, TaskStateMachine};
pub use workflow_engine::{
    ActionRun, ActionRunStatus, EngineDependencies, EngineSettings, TaskUpdate, WorkflowEngine,
    WorkflowProgress,
};
