// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use crate::client::EngineClient;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Register a new agent
    Register {
        /// Agent display name
        #[arg(value_name = "NAME")]
        name: String,

        /// Communication protocol (nlweb, mcp, a2a)
        #[arg(short, long, default_value = "mcp")]
        protocol: String,

        /// Starting trust score (default: 50)
        #[arg(long, value_name = "SCORE")]
        trust_score: Option<f64>,
    },

    /// List registered agents
    List,

    /// Show one agent
    Show {
        /// Agent ID
        #[arg(value_name = "AGENT_ID")]
        agent_id: Uuid,
    },
}

pub async fn handle_command(command: AgentCommand, host: &str, port: u16) -> Result<()> {
    let client = EngineClient::new(host, port)?;

    match command {
        AgentCommand::Register {
            name,
            protocol,
            trust_score,
        } => register_agent(client, &name, &protocol, trust_score).await,
        AgentCommand::List => list_agents(client).await,
        AgentCommand::Show { agent_id } => show_agent(client, agent_id).await,
    }
}

async fn register_agent(
    client: EngineClient,
    name: &str,
    protocol: &str,
    trust_score: Option<f64>,
) -> Result<()> {
    let agent = client.register_agent(name, protocol, trust_score).await?;

    println!("{}", format!("✓ Agent registered: {}", agent.id).green());
    println!("  Name: {}", agent.name.bold());
    println!("  Protocol: {}", agent.protocol);
    println!("  Trust score: {:.1}", agent.trust_score);

    Ok(())
}

async fn list_agents(client: EngineClient) -> Result<()> {
    let agents = client.list_agents().await?;

    if agents.is_empty() {
        println!("{}", "No agents registered".yellow());
        return Ok(());
    }

    println!("{} agents registered:", agents.len());
    println!(
        "{:<38} {:<20} {:<8} {:>7} {}",
        "ID", "NAME", "PROTOCOL", "TRUST", "ACTIVE"
    );

    for agent in agents {
        println!(
            "{:<38} {:<20} {:<8} {:>7.1} {}",
            agent.id,
            agent.name.bold(),
            agent.protocol,
            agent.trust_score,
            if agent.is_active {
                "yes".green()
            } else {
                "no".red()
            }
        );
    }

    Ok(())
}

async fn show_agent(client: EngineClient, agent_id: Uuid) -> Result<()> {
    let agent = client.get_agent(agent_id).await?;

    println!("Agent {}", agent.id);
    println!("  Name: {}", agent.name.bold());
    println!("  Protocol: {}", agent.protocol);
    println!("  Trust score: {:.1}", agent.trust_score);
    println!("  Active: {}", agent.is_active);

    Ok(())
}
