//! Task routing commands
//!
//! Commands: assign, reassign

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use crate::client::EngineClient;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Route a task to the highest-trust agent on a protocol
    Assign {
        /// Task type label
        #[arg(value_name = "TASK_TYPE")]
        task_type: String,

        /// Protocol pool to draw from (nlweb, mcp, a2a)
        #[arg(short, long, default_value = "mcp")]
        protocol: String,

        /// Input payload (JSON string or @file.json)
        #[arg(short, long, value_name = "INPUT")]
        input: Option<String>,
    },

    /// Re-evaluate a task against the reassignment policy
    Reassign {
        /// Task ID
        #[arg(value_name = "TASK_ID")]
        task_id: Uuid,
    },
}

pub async fn handle_command(command: TaskCommand, host: &str, port: u16) -> Result<()> {
    let client = EngineClient::new(host, port)?;

    match command {
        TaskCommand::Assign {
            task_type,
            protocol,
            input,
        } => assign_task(client, &task_type, &protocol, input).await,
        TaskCommand::Reassign { task_id } => reassign_task(client, task_id).await,
    }
}

async fn assign_task(
    client: EngineClient,
    task_type: &str,
    protocol: &str,
    input: Option<String>,
) -> Result<()> {
    let payload = parse_input(input)?;
    let assignment = client.assign_task(protocol, task_type, payload).await?;

    println!(
        "{}",
        format!("✓ Task assigned: {}", assignment.task_id).green()
    );
    println!(
        "  Agent: {} ({:.1} trust)",
        assignment.agent.name.bold(),
        assignment.agent.trust_score
    );
    println!("  Status: {}", assignment.status);

    Ok(())
}

async fn reassign_task(client: EngineClient, task_id: Uuid) -> Result<()> {
    let outcome = client.reassign_task(task_id).await?;

    match outcome.status.as_str() {
        "completed" => {
            println!("{}", "Task already completed, nothing to do".yellow());
        }
        "no_reassignment" => {
            println!("{}", "Task is healthy, no reassignment needed".green());
        }
        "reassigned" => {
            let reason = outcome.reason.as_deref().unwrap_or("unknown");
            println!(
                "{}",
                format!("✓ Task {} reassigned ({})", task_id, reason).green()
            );
            if let Some(agent) = outcome.new_agent {
                println!(
                    "  New agent: {} ({:.1} trust)",
                    agent.name.bold(),
                    agent.trust_score
                );
            }
        }
        other => {
            println!("Unexpected outcome: {}", other);
        }
    }

    Ok(())
}

fn parse_input(input: Option<String>) -> Result<serde_json::Value> {
    match input {
        None => Ok(serde_json::json!({})),
        Some(s) if s.starts_with('@') => {
            let path = &s[1..];
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file: {}", path))?;
            serde_json::from_str(&content).context("Failed to parse input JSON")
        }
        Some(s) => serde_json::from_str(&s).context("Failed to parse input JSON"),
    }
}
