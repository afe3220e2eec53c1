//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//! - Workflow templates (YAML import)

pub mod config;
pub mod logging;
pub mod templates;
