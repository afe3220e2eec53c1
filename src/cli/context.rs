//! Wiring of the SQLite adapters into a ready engine.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::agents::build_registry;
use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteActivityLog, SqliteAutomationGateway,
    SqliteHierarchyStore, SqliteOrganizationSettings,
};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{
    AgentRegistry, EngineDependencies, EngineSettings, EventBus, EventBusConfig, WorkflowEngine,
};

/// Everything a command needs, opened once per invocation.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub store: Arc<SqliteHierarchyStore>,
    pub settings: Arc<SqliteOrganizationSettings>,
    pub gateway: Arc<SqliteAutomationGateway>,
    pub activity_log: Arc<SqliteActivityLog>,
    pub registry: Arc<AgentRegistry>,
    pub engine: WorkflowEngine,
}

impl AppContext {
    /// Open the database, run migrations and wire the engine.
    pub async fn open(config: Config) -> Result<Self> {
        if !config.database.path.starts_with("sqlite:")
            && !Path::new(&config.database.path).exists()
        {
            anyhow::bail!(
                "Database not found at {}. Run 'caseflow init' first.",
                config.database.path
            );
        }

        let pool = initialize_database(
            &database_url(&config.database.path),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .context("Failed to open database")?;

        Self::from_pool(config, pool)
    }

    /// Build on an already migrated pool.
    pub fn from_pool(config: Config, pool: SqlitePool) -> Result<Self> {
        let store = Arc::new(SqliteHierarchyStore::new(pool.clone()));
        let settings = Arc::new(SqliteOrganizationSettings::new(pool.clone()));
        let gateway = Arc::new(SqliteAutomationGateway::new(pool.clone()));
        let activity_log = Arc::new(SqliteActivityLog::new(pool.clone()));

        let registry =
            Arc::new(build_registry(&config.agents).context("Failed to register agents")?);
        let bus = EventBus::new(EventBusConfig::default()).with_sink(activity_log.clone());

        let engine = WorkflowEngine::new(
            EngineDependencies {
                store: store.clone(),
                activity: Arc::new(bus),
                registry: registry.clone(),
                installations: settings.clone(),
                llm_configs: settings.clone(),
                gateway: gateway.clone(),
            },
            EngineSettings::from(&config),
        );

        Ok(Self {
            config,
            pool,
            store,
            settings,
            gateway,
            activity_log,
            registry,
            engine,
        })
    }
}

/// Load configuration from the working directory and open the engine on it.
pub async fn open_context() -> Result<AppContext> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    AppContext::open(config).await
}
