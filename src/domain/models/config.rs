//! Application configuration types.

use serde::{Deserialize, Serialize};

/// Main configuration structure for caseflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// AI agent configuration
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Task automation limits
    #[serde(default)]
    pub automation: AutomationConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".caseflow/caseflow.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// AI agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentsConfig {
    /// Upper bound on a single agent call
    #[serde(default = "default_agent_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP agents registered at startup
    #[serde(default)]
    pub http: Vec<HttpAgentConfig>,
}

const fn default_agent_timeout_secs() -> u64 {
    120
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_agent_timeout_secs(),
            http: vec![],
        }
    }
}

/// An agent served over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpAgentConfig {
    /// Identifier tasks reference in `ai_agent_id`
    pub slug: String,

    /// URL the agent request is POSTed to
    pub endpoint: String,
}

/// Task automation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AutomationConfig {
    /// Longest action list a task may run
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,
}

const fn default_max_actions() -> usize {
    50
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            max_actions: default_max_actions(),
        }
    }
}
