//! Layered configuration loading: defaults, YAML files, then environment.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Directory holding project configuration and the database.
pub const PROJECT_DIR: &str = ".caseflow";

/// Prefix for environment overrides; nested keys are split on `__`.
pub const ENV_PREFIX: &str = "CASEFLOW_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid agent timeout: {0}s. Must be between 1 and 3600")]
    InvalidAgentTimeout(u64),

    #[error("Invalid max_actions: {0}. Must be between 1 and 1000")]
    InvalidMaxActions(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project in the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .caseflow/config.yaml (created by init)
    /// 3. .caseflow/local.yaml (optional local overrides)
    /// 4. Environment variables (CASEFLOW_* prefix)
    pub fn load() -> Result<Config> {
        Self::load_from_root(".")
    }

    /// Same as [`ConfigLoader::load`] for a project rooted at `root`.
    pub fn load_from_root(root: impl AsRef<Path>) -> Result<Config> {
        let project = root.as_ref().join(PROJECT_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project.join("config.yaml")))
            .merge(Yaml::file(project.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.agents.timeout_secs == 0 || config.agents.timeout_secs > 3600 {
            return Err(ConfigError::InvalidAgentTimeout(config.agents.timeout_secs));
        }

        if config.automation.max_actions == 0 || config.automation.max_actions > 1000 {
            return Err(ConfigError::InvalidMaxActions(config.automation.max_actions));
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &config.agents.http {
            if agent.slug.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "HTTP agent slug cannot be empty".to_string(),
                ));
            }
            if agent.endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "HTTP agent '{}' endpoint cannot be empty",
                    agent.slug
                )));
            }
            if !seen.insert(crate::domain::models::normalize_agent_slug(&agent.slug)) {
                return Err(ConfigError::ValidationFailed(format!(
                    "HTTP agent '{}' is configured twice",
                    agent.slug
                )));
            }
        }

        Ok(())
    }
}
