//! Domain layer for the caseflow workflow engine
//!
//! This module contains the hierarchy models, the error taxonomy and the
//! port traits that collaborators implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
