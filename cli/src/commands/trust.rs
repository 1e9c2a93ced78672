// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Trust scoring commands
//!
//! Commands: recalculate, delta, audit, trend

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use crate::client::EngineClient;

#[derive(Subcommand)]
pub enum TrustCommand {
    /// Recompute an agent's trust score from recent history
    Recalculate {
        /// Agent ID
        #[arg(value_name = "AGENT_ID")]
        agent_id: Uuid,
    },

    /// Apply a manual trust delta
    Delta {
        /// Agent ID
        #[arg(value_name = "AGENT_ID")]
        agent_id: Uuid,

        /// Signed score delta, clamped into [0, 100] on apply
        #[arg(value_name = "DELTA", allow_hyphen_values = true)]
        delta: f64,

        /// Reason recorded on the trust event
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Audit all agents for repeated sub-threshold score dips
    Audit {
        /// Score threshold (default: configured, 70)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Decompose an agent's score trajectory into trend components
    Trend {
        /// Agent ID
        #[arg(value_name = "AGENT_ID")]
        agent_id: Uuid,

        /// Seasonal frequency in points
        #[arg(long, default_value = "7")]
        freq: usize,

        /// Sliding window size in points
        #[arg(long, default_value = "14")]
        window: usize,
    },
}

pub async fn handle_command(command: TrustCommand, host: &str, port: u16) -> Result<()> {
    let client = EngineClient::new(host, port)?;

    match command {
        TrustCommand::Recalculate { agent_id } => recalculate(client, agent_id).await,
        TrustCommand::Delta {
            agent_id,
            delta,
            reason,
        } => apply_delta(client, agent_id, delta, reason).await,
        TrustCommand::Audit { threshold } => run_audit(client, threshold).await,
        TrustCommand::Trend {
            agent_id,
            freq,
            window,
        } => show_trend(client, agent_id, freq, window).await,
    }
}

async fn recalculate(client: EngineClient, agent_id: Uuid) -> Result<()> {
    let outcome = client.recalculate_trust(agent_id).await?;

    println!(
        "{}",
        format!("✓ Trust recalculated for {}", outcome.agent_id).green()
    );
    println!(
        "  Score: {:.1} → {:.1} ({:+.1})",
        outcome.previous_score, outcome.trust_score, outcome.delta
    );
    println!("  Reason: {}", outcome.reason);
    if !outcome.adjustments.triggers_applied.is_empty() {
        println!(
            "  Triggers: {} ({:+.1} penalty, {:+.1} bonus)",
            outcome.adjustments.triggers_applied.join(", ").yellow(),
            outcome.adjustments.delayed_penalty,
            outcome.adjustments.sla_bonus
        );
    }

    Ok(())
}

async fn apply_delta(
    client: EngineClient,
    agent_id: Uuid,
    delta: f64,
    reason: Option<String>,
) -> Result<()> {
    let outcome = client
        .apply_trust_delta(agent_id, delta, reason.as_deref())
        .await?;

    println!(
        "{}",
        format!("✓ Delta applied to {}", outcome.agent_id).green()
    );
    println!("  Score: {:.1}", outcome.trust_score);
    if (outcome.applied_delta - outcome.requested_delta).abs() > f64::EPSILON {
        println!(
            "  {} requested {:+.1}, applied {:+.1} (clamped)",
            "Note:".yellow(),
            outcome.requested_delta,
            outcome.applied_delta
        );
    }

    Ok(())
}

async fn run_audit(client: EngineClient, threshold: Option<f64>) -> Result<()> {
    let report = client.run_audit(threshold).await?;

    if report.flagged_agents.is_empty() {
        println!(
            "{}",
            format!("No agents flagged (threshold {:.0})", report.threshold).green()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} agents flagged (threshold {:.0}):",
            report.flagged_agents.len(),
            report.threshold
        )
        .red()
    );
    println!("{:<38} {:<20} {:>5} {:>7}", "ID", "NAME", "DIPS", "SCORE");

    for flagged in report.flagged_agents {
        println!(
            "{:<38} {:<20} {:>5} {:>7.1}",
            flagged.agent_id,
            flagged.agent_name.bold(),
            flagged.occurrences,
            flagged.current_score
        );
    }

    Ok(())
}

async fn show_trend(client: EngineClient, agent_id: Uuid, freq: usize, window: usize) -> Result<()> {
    let trend = client.trend(agent_id, freq, window).await?;

    println!(
        "Trend for {} (score {:.1}, {} points)",
        trend.agent_id, trend.current_score, trend.series_len
    );

    if trend.windows.is_empty() {
        println!(
            "{}",
            "Not enough history for the requested window".yellow()
        );
        return Ok(());
    }

    println!("{} windows:", trend.windows.len());
    for decomposition in &trend.windows {
        let max_residual = decomposition
            .residual
            .iter()
            .fold(0.0f64, |max, r| max.max(r.abs()));
        println!(
            "  {} → {}  max residual {:.2}",
            decomposition.window_start.format("%Y-%m-%d %H:%M"),
            decomposition.window_end.format("%Y-%m-%d %H:%M"),
            max_residual
        );
    }

    Ok(())
}
