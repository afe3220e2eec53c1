//! Agent installation CLI commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::context::{open_context, AppContext};
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::normalize_agent_slug;
use crate::domain::ports::AgentInstallations;

/// Arguments for `caseflow agent`.
#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

/// Agent subcommands.
#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// Enable an agent for an organization
    Enable {
        /// Agent slug
        slug: String,
        #[arg(long)]
        org: Uuid,
    },
    /// Disable an agent for an organization
    Disable {
        /// Agent slug
        slug: String,
        #[arg(long)]
        org: Uuid,
    },
    /// List registered agents, optionally with their state for an organization
    List {
        #[arg(long)]
        org: Option<Uuid>,
    },
}

/// Result of installing or removing an agent.
#[derive(Debug, serde::Serialize)]
pub struct InstallationOutput {
    pub success: bool,
    pub agent: String,
    pub organization_id: Uuid,
    pub enabled: bool,
    pub registered: bool,
}

impl CommandOutput for InstallationOutput {
    fn to_human(&self) -> String {
        let state = if self.enabled { "enabled" } else { "disabled" };
        let mut msg = format!(
            "Agent '{}' {} for organization {}",
            self.agent, state, self.organization_id
        );
        if !self.registered {
            msg.push_str("\nWarning: no adapter is registered under this slug.");
        }
        msg
    }
}

/// One row of the agent list.
#[derive(Debug, serde::Serialize)]
pub struct AgentLine {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Registered agents and their install state.
#[derive(Debug, serde::Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentLine>,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        if self.agents.is_empty() {
            return "No agents registered.".to_string();
        }
        let mut table = list_table(&["slug", "enabled"]);
        for agent in &self.agents {
            let enabled = match agent.enabled {
                Some(true) => "yes",
                Some(false) => "no",
                None => "-",
            };
            table.add_row(vec![agent.slug.clone(), enabled.to_string()]);
        }
        format!("{table}\n\nShowing {} agent(s)", self.total)
    }
}

/// Run an agent subcommand.
pub async fn execute(args: AgentArgs, json_mode: bool) -> Result<()> {
    let ctx = open_context().await?;
    let registered = ctx.registry.slugs();

    match args.command {
        AgentCommands::Enable { slug, org } => {
            let out = set_installation(&ctx, &registered, org, &slug, true).await?;
            output(&out, json_mode);
        }
        AgentCommands::Disable { slug, org } => {
            let out = set_installation(&ctx, &registered, org, &slug, false).await?;
            output(&out, json_mode);
        }
        AgentCommands::List { org } => {
            let mut agents = Vec::with_capacity(registered.len());
            for slug in registered {
                let enabled = match org {
                    Some(org) => Some(ctx.settings.is_enabled(org, &slug).await?),
                    None => None,
                };
                agents.push(AgentLine { slug, enabled });
            }
            let out = AgentListOutput {
                total: agents.len(),
                agents,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

async fn set_installation(
    ctx: &AppContext,
    registered: &[String],
    org: Uuid,
    slug: &str,
    enabled: bool,
) -> Result<InstallationOutput> {
    ctx.settings.set_installation(org, slug, enabled).await?;
    let agent = normalize_agent_slug(slug);
    Ok(InstallationOutput {
        success: true,
        registered: registered.contains(&agent),
        agent,
        organization_id: org,
        enabled,
    })
}
