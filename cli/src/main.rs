// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! # Arbiter Trust Engine CLI
//!
//! The `arbiter` binary runs the trust engine server and drives it from the
//! command line.
//!
//! ## Architecture
//!
//! - **Server mode**: `arbiter serve` hosts the HTTP engine API
//! - **Client mode**: every other command talks to a running server over HTTP
//!
//! ## Commands
//!
//! - `arbiter serve` - Run the engine server
//! - `arbiter status` - Check server reachability
//! - `arbiter agent register|list|show` - Agent management
//! - `arbiter task assign|reassign` - Task routing
//! - `arbiter trust recalculate|delta|audit|trend` - Trust operations
//! - `arbiter config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod client;
mod commands;
mod serve;

use commands::{AgentCommand, ConfigCommand, TaskCommand, TrustCommand};

/// Default API host when neither flag, env, nor config provides one.
const DEFAULT_HOST: &str = "127.0.0.1";
/// Default API port when neither flag, env, nor config provides one.
const DEFAULT_PORT: u16 = 8700;

/// Arbiter - trust-weighted task routing for autonomous agents
#[derive(Parser)]
#[command(name = "arbiter")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ARBITER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API host (default: 127.0.0.1)
    #[arg(long, global = true, env = "ARBITER_HOST")]
    host: Option<String>,

    /// HTTP API port (default: 8700)
    #[arg(long, global = true, env = "ARBITER_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ARBITER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine server
    #[command(name = "serve")]
    Serve,

    /// Check whether the engine server is reachable
    #[command(name = "status")]
    Status,

    /// Agent management
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Task routing operations
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Trust scoring operations
    #[command(name = "trust")]
    Trust {
        #[command(subcommand)]
        command: TrustCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up ARBITER_* settings from a local .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    // Client commands fall back to the server defaults; serve resolves its
    // bind address against the config file instead.
    let host = cli.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = cli.port.unwrap_or(DEFAULT_PORT);

    match cli.command {
        Some(Commands::Serve) => serve::run(cli.config, cli.host, cli.port).await,
        Some(Commands::Status) => commands::status::run(&host, port).await,
        Some(Commands::Agent { command }) => {
            commands::agent::handle_command(command, &host, port).await
        }
        Some(Commands::Task { command }) => {
            commands::task::handle_command(command, &host, port).await
        }
        Some(Commands::Trust { command }) => {
            commands::trust::handle_command(command, &host, port).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
