//! CLI command implementations.

pub mod agent;
pub mod init;
pub mod llm;
pub mod review;
pub mod task;
pub mod workflow;
