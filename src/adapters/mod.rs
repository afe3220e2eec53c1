//! Adapters for the engine's ports.

pub mod agents;
pub mod sqlite;
