// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use arbiter_core::domain::config::{EngineConfigManifest, StorageBackendKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./arbiter-config.yaml)
        #[arg(short, long, default_value = "./arbiter-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ARBITER_CONFIG_PATH: {}",
            std::env::var("ARBITER_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./arbiter-config.yaml");
        println!("  4. ~/.arbiter/config.yaml");
        println!("  5. /etc/arbiter/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!(
        "  Bind: {}:{}",
        config.spec.server.bind_address, config.spec.server.port
    );
    println!();

    println!("{}", "Storage:".bold());
    match config.spec.storage.backend {
        StorageBackendKind::Memory => println!("  Backend: memory"),
        StorageBackendKind::Postgres => {
            println!("  Backend: postgres");
            println!(
                "  Connection: {}",
                if config.spec.storage.connection_string.is_some() {
                    "(configured)"
                } else {
                    "(missing)"
                }
            );
        }
    }
    println!();

    let trust = &config.spec.trust;
    println!("{}", "Trust scoring:".bold());
    println!(
        "  Weights: latency {:.2} / completion {:.2} / consistency {:.2} / failure {:.2} / volatility {:.2} / anomaly {:.2} / sla {:.2}",
        trust.weights.latency,
        trust.weights.completion,
        trust.weights.consistency,
        trust.weights.failure,
        trust.weights.volatility,
        trust.weights.anomaly,
        trust.weights.sla
    );
    println!("  SLA threshold: {} ms", trust.sla_threshold_ms);
    println!("  Metrics window: {} days", trust.metrics_window_days);
    println!(
        "  Triggers: {} delayed tasks → {:+.0}, {} on-time → {:+.0} (window {} s)",
        trust.triggers.delayed_task_threshold,
        trust.triggers.delayed_penalty,
        trust.triggers.sla_bonus_threshold,
        trust.triggers.sla_bonus,
        trust.triggers.window_secs
    );
    println!(
        "  Reassignment: latency > {} ms or drop ≤ {:.0}",
        trust.reassignment.latency_threshold_ms, trust.reassignment.trust_drop_threshold
    );
    println!(
        "  Audit: threshold {:.0}, lookback {} h",
        trust.audit.threshold, trust.audit.window_hours
    );
    println!();

    if let Some(observability) = &config.spec.observability {
        println!("{}", "Observability:".bold());
        if let Some(logging) = &observability.logging {
            println!("  Log level: {}", logging.level);
        }
        if let Some(metrics) = &observability.metrics {
            println!(
                "  Metrics: {} (port {})",
                if metrics.enabled { "enabled" } else { "disabled" },
                metrics.port
            );
        }
        println!();
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = EngineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Sample configuration written to {}", output.display()).green()
    );

    Ok(())
}
