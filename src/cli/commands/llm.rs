//! LLM configuration CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::open_context;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::LlmConfig;
use crate::domain::ports::LlmConfigProvider;

/// Arguments for `caseflow llm`.
#[derive(Args, Debug)]
pub struct LlmArgs {
    #[command(subcommand)]
    pub command: LlmCommands,
}

/// LLM configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum LlmCommands {
    /// Create or replace a named LLM configuration
    Set {
        /// Configuration name
        name: String,
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
        /// API key passed to the agent
        #[arg(long, env = "CASEFLOW_LLM_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Make this the organization's default configuration
        #[arg(long)]
        default: bool,
    },
    /// Show which configuration a task would use
    Resolve {
        #[arg(long)]
        org: Uuid,
        /// Preferred configuration name
        name: Option<String>,
    },
}

/// The organization's LLM configuration.
#[derive(Debug, serde::Serialize)]
pub struct LlmConfigOutput {
    pub organization_id: Uuid,
    pub name: String,
    pub provider: String,
    pub model: String,
    pub has_api_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl LlmConfigOutput {
    fn new(organization_id: Uuid, config: &LlmConfig, is_default: Option<bool>) -> Self {
        Self {
            organization_id,
            name: config.name.clone(),
            provider: config.provider.clone(),
            model: config.model.clone(),
            has_api_key: config.api_key.is_some(),
            is_default,
        }
    }
}

impl CommandOutput for LlmConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("LLM configuration '{}'", self.name),
            format!("  Provider: {}", self.provider),
            format!("  Model:    {}", self.model),
            format!("  API key:  {}", if self.has_api_key { "set" } else { "none" }),
        ];
        if self.is_default == Some(true) {
            lines.push("  Default for the organization".to_string());
        }
        lines.join("\n")
    }
}

/// Shown when no LLM configuration is stored.
#[derive(Debug, serde::Serialize)]
pub struct NoConfigOutput {
    pub organization_id: Uuid,
    pub resolved: bool,
}

impl CommandOutput for NoConfigOutput {
    fn to_human(&self) -> String {
        format!("No LLM configuration resolves for organization {}.", self.organization_id)
    }
}

/// Run an LLM subcommand.
pub async fn execute(args: LlmArgs, json_mode: bool) -> Result<()> {
    let ctx = open_context().await?;

    match args.command {
        LlmCommands::Set { name, org, provider, model, api_key, default } => {
            let config = LlmConfig {
                name,
                provider,
                model,
                api_key,
            };
            ctx.settings.upsert_llm_config(org, &config, default).await?;
            output(&LlmConfigOutput::new(org, &config, Some(default)), json_mode);
        }
        LlmCommands::Resolve { org, name } => {
            match ctx.settings.resolve(org, name.as_deref()).await? {
                Some(config) => output(&LlmConfigOutput::new(org, &config, None), json_mode),
                None => output(
                    &NoConfigOutput {
                        organization_id: org,
                        resolved: false,
                    },
                    json_mode,
                ),
            }
        }
    }

    Ok(())
}
