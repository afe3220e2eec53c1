//! Caseflow - workflow execution engine for practice management
//!
//! Caseflow runs hierarchical case workflows (workflow, stage, step, task)
//! in which completing the last unit of a level completes its parent,
//! tasks carry condition-gated automation actions, and AI agents produce
//! output that can be held for human review before a task completes.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports the engine depends on
//! - **Service Layer** (`services`): state machine, auto-progression, automation and agents
//! - **Adapters** (`adapters`): SQLite persistence and agent adapters
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and templates
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ChecklistItem, Config, Stage, Step, Subtask, Task, TaskStatus, Workflow, WorkflowStatus,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AutomationOutcome, CascadeReport, WorkflowEngine};
