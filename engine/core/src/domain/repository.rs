// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in
//! the domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AgentRepository` | `Agent` | `InMemoryTrustStore`, `PostgresAgentRepository` |
//! | `TaskRepository` | `Task` | `InMemoryTrustStore`, `PostgresTaskRepository` |
//! | `TrustEventRepository` | `TrustEvent` | `InMemoryTrustStore`, `PostgresTrustEventRepository` |
//! | `AuditLogRepository` | `AuditRecord` | `InMemoryTrustStore`, `PostgresAuditLogRepository` |
//!
//! ## Compound operations
//!
//! Two operations are deliberately compound so backends can make them
//! atomic: `update_score_with_event` (agent score + trust event) and
//! `commit_reassignment` (task mutation + audit record). PostgreSQL
//! implementations wrap each in a single transaction; the in-memory store
//! performs each under one write section.
//!
//! ## Storage Backend Abstraction
//!
//! Concrete implementations are selected at daemon startup based on
//! configuration (`arbiter-config.yaml`). In-memory implementations are
//! used for development and testing; PostgreSQL for production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::agent::{Agent, AgentId, Protocol};
use crate::domain::audit::AuditRecord;
use crate::domain::task::{Task, TaskId};
use crate::domain::trust::TrustEvent;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Repository interface for Agent aggregates
/// One repository per aggregate root (Trust Scoring Context)
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Save agent (create or update)
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError>;

    /// Find agent by ID
    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;

    /// List all agents
    async fn list_all(&self) -> Result<Vec<Agent>, RepositoryError>;

    /// List active agents for one protocol, sorted by trust score descending
    async fn list_active_by_protocol(
        &self,
        protocol: Protocol,
    ) -> Result<Vec<Agent>, RepositoryError>;

    /// Atomically set the agent's score and append the trust event that
    /// records the change. The event's delta is `new_score - previous`.
    async fn update_score_with_event(
        &self,
        id: AgentId,
        new_score: f64,
        event: &TrustEvent,
    ) -> Result<(), RepositoryError>;
}

/// Repository interface for Task aggregates
/// One repository per aggregate root (Routing Context)
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Save task (create or update)
    async fn save(&self, task: &Task) -> Result<(), RepositoryError>;

    /// Find task by ID
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// List an agent's tasks created at or after `since`, ascending by
    /// creation time
    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError>;

    /// Atomically move the task to another agent (agent_id, assigned_at,
    /// status=assigned) and append the handoff audit record.
    async fn commit_reassignment(
        &self,
        id: TaskId,
        to_agent: AgentId,
        reassigned_at: DateTime<Utc>,
        audit: &AuditRecord,
    ) -> Result<(), RepositoryError>;
}

/// Repository interface for the append-only TrustEvent ledger
#[async_trait]
pub trait TrustEventRepository: Send + Sync {
    /// Append one event
    async fn insert(&self, event: &TrustEvent) -> Result<(), RepositoryError>;

    /// List an agent's events created at or after `since`, ascending by
    /// creation time
    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrustEvent>, RepositoryError>;
}

/// Repository interface for the audit log (append-only)
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one audit record
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
