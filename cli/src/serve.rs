// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! Foreground HTTP server for the trust engine.
//!
//! Loads configuration, wires the repositories for the selected storage
//! backend into the application services, and runs the Axum API until
//! Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use arbiter_core::{
    application::{
        StandardReassignmentService, StandardTaskAssignmentService, StandardTrustAuditService,
        StandardTrustScoringService,
    },
    domain::config::EngineConfigManifest,
    domain::repository::{
        AgentRepository, AuditLogRepository, StorageBackend, TaskRepository, TrustEventRepository,
    },
    infrastructure::{
        db::Database,
        event_bus::EventBus,
        keyed_lock::KeyedLockRegistry,
        repositories::{
            postgres_agent::PostgresAgentRepository, postgres_audit::PostgresAuditLogRepository,
            postgres_task::PostgresTaskRepository,
            postgres_trust_event::PostgresTrustEventRepository, InMemoryTrustStore,
        },
    },
    presentation::api::{app, AppState},
};

/// Repository handles resolved from the configured storage backend.
struct Repositories {
    agents: Arc<dyn AgentRepository>,
    tasks: Arc<dyn TaskRepository>,
    trust_events: Arc<dyn TrustEventRepository>,
    audit_log: Arc<dyn AuditLogRepository>,
}

pub async fn run(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    info!("Configuration loaded: name={}", config.metadata.name);

    let repos = build_repositories(&config).await?;

    let event_bus = Arc::new(EventBus::with_default_capacity());
    let agent_locks = Arc::new(KeyedLockRegistry::new());
    let task_locks = Arc::new(KeyedLockRegistry::new());

    let trust_config = config.spec.trust.clone();

    let scoring = Arc::new(StandardTrustScoringService::new(
        repos.agents.clone(),
        repos.tasks.clone(),
        repos.trust_events.clone(),
        repos.audit_log.clone(),
        agent_locks,
        event_bus.clone(),
        trust_config.clone(),
    ));
    let reassignment = Arc::new(StandardReassignmentService::new(
        repos.tasks.clone(),
        repos.agents.clone(),
        repos.trust_events.clone(),
        task_locks,
        event_bus.clone(),
        trust_config.reassignment.clone(),
    ));
    let assignment = Arc::new(StandardTaskAssignmentService::new(
        repos.agents.clone(),
        repos.tasks.clone(),
        repos.audit_log.clone(),
        event_bus.clone(),
    ));
    let audit = Arc::new(StandardTrustAuditService::new(
        repos.agents.clone(),
        repos.trust_events.clone(),
        event_bus.clone(),
        trust_config,
    ));

    install_metrics_exporter(&config)?;

    let state = Arc::new(AppState {
        scoring,
        reassignment,
        assignment,
        audit,
        agents: repos.agents.clone(),
        event_bus,
        started_at: Instant::now(),
    });

    // Flags override the config file's server section
    let bind_address = host.unwrap_or_else(|| config.spec.server.bind_address.clone());
    let bind_port = port.unwrap_or(config.spec.server.port);
    let addr = format!("{}:{}", bind_address, bind_port);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Trust engine listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Trust engine shutting down");

    Ok(())
}

async fn build_repositories(config: &EngineConfigManifest) -> Result<Repositories> {
    match config.storage_backend()? {
        StorageBackend::InMemory => {
            info!("Using in-memory storage backend");
            let store = InMemoryTrustStore::new();
            Ok(Repositories {
                agents: Arc::new(store.clone()),
                tasks: Arc::new(store.clone()),
                trust_events: Arc::new(store.clone()),
                audit_log: Arc::new(store),
            })
        }
        StorageBackend::PostgreSQL(pg) => {
            info!("Using postgres storage backend");
            let database = Database::new(&pg.connection_string)
                .await
                .context("Failed to connect to PostgreSQL")?;
            let pool = database.get_pool().clone();
            Ok(Repositories {
                agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
                tasks: Arc::new(PostgresTaskRepository::new(pool.clone())),
                trust_events: Arc::new(PostgresTrustEventRepository::new(pool.clone())),
                audit_log: Arc::new(PostgresAuditLogRepository::new(pool)),
            })
        }
    }
}

fn install_metrics_exporter(config: &EngineConfigManifest) -> Result<()> {
    let Some(metrics) = config
        .spec
        .observability
        .as_ref()
        .and_then(|obs| obs.metrics.as_ref())
    else {
        return Ok(());
    };

    if !metrics.enabled {
        return Ok(());
    }

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([127, 0, 0, 1], metrics.port))
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus exporter listening on 127.0.0.1:{}", metrics.port);

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
