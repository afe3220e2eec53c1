//! Per-organization agent installations and LLM configurations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_agent_slug, LlmConfig};
use crate::domain::ports::{AgentInstallations, LlmConfigProvider};

/// Per-organization agent installs and LLM settings.
#[derive(Clone)]
pub struct SqliteOrganizationSettings {
    pool: SqlitePool,
}

impl SqliteOrganizationSettings {
    /// Create a settings store over an open pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Install (or re-enable / disable) an agent for an organization.
    pub async fn set_installation(
        &self,
        organization_id: Uuid,
        agent_slug: &str,
        enabled: bool,
    ) -> DomainResult<()> {
        let slug = normalize_agent_slug(agent_slug);
        if slug.is_empty() {
            return Err(DomainError::Validation("Agent slug cannot be empty".to_string()));
        }

        sqlx::query(
            r#"INSERT INTO agent_installations (organization_id, agent_slug, enabled, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(organization_id, agent_slug)
               DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at"#,
        )
        .bind(organization_id.to_string())
        .bind(&slug)
        .bind(enabled)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!(%organization_id, agent = %slug, enabled, "Agent installation updated");
        Ok(())
    }

    /// Insert or replace a named LLM configuration. Marking one as default
    /// clears the flag on the organization's others.
    pub async fn upsert_llm_config(
        &self,
        organization_id: Uuid,
        config: &LlmConfig,
        is_default: bool,
    ) -> DomainResult<()> {
        if config.name.trim().is_empty() {
            return Err(DomainError::Validation("LLM configuration needs a name".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        if is_default {
            sqlx::query("UPDATE llm_configs SET is_default = 0 WHERE organization_id = ?")
                .bind(organization_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"INSERT INTO llm_configs (organization_id, name, provider, model, api_key,
               is_default, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(organization_id, name)
               DO UPDATE SET provider = excluded.provider, model = excluded.model,
                             api_key = excluded.api_key, is_default = excluded.is_default,
                             updated_at = excluded.updated_at"#,
        )
        .bind(organization_id.to_string())
        .bind(&config.name)
        .bind(&config.provider)
        .bind(&config.model)
        .bind(&config.api_key)
        .bind(is_default)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            %organization_id,
            name = %config.name,
            is_default,
            "LLM configuration saved"
        );
        Ok(())
    }
}

#[async_trait]
impl AgentInstallations for SqliteOrganizationSettings {
    async fn is_enabled(&self, organization_id: Uuid, agent_slug: &str) -> DomainResult<bool> {
        let row: Option<(bool,)> = sqlx::query_as(
            "SELECT enabled FROM agent_installations WHERE organization_id = ? AND agent_slug = ?",
        )
        .bind(organization_id.to_string())
        .bind(normalize_agent_slug(agent_slug))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some_and(|(enabled,)| enabled))
    }
}

#[derive(sqlx::FromRow)]
struct LlmConfigRow {
    name: String,
    provider: String,
    model: String,
    api_key: Option<String>,
}

impl From<LlmConfigRow> for LlmConfig {
    fn from(row: LlmConfigRow) -> Self {
        Self {
            name: row.name,
            provider: row.provider,
            model: row.model,
            api_key: row.api_key,
        }
    }
}

#[async_trait]
impl LlmConfigProvider for SqliteOrganizationSettings {
    async fn resolve(
        &self,
        organization_id: Uuid,
        preferred: Option<&str>,
    ) -> DomainResult<Option<LlmConfig>> {
        let row: Option<LlmConfigRow> = match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => {
                sqlx::query_as(
                    "SELECT name, provider, model, api_key FROM llm_configs \
                     WHERE organization_id = ? AND name = ?",
                )
                .bind(organization_id.to_string())
                .bind(name)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT name, provider, model, api_key FROM llm_configs \
                     WHERE organization_id = ? AND is_default = 1",
                )
                .bind(organization_id.to_string())
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(row.map(Into::into))
    }
}
