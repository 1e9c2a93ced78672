// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Audit Log Repository
//!
//! Production `AuditLogRepository` implementation over the append-only
//! `audit_logs` table. Retention and reporting over this table belong to
//! the host platform, not the engine.
//!
//! Expected schema (managed externally):
//! `audit_logs(id uuid primary key, agent_id uuid, task_id uuid,
//! action_type text, resource text, payload jsonb, recorded_at timestamptz)`

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::domain::audit::AuditRecord;
use crate::domain::repository::{AuditLogRepository, RepositoryError};

use super::postgres_task::{bind_audit_insert, AUDIT_INSERT_SQL};

pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        bind_audit_insert(sqlx::query(AUDIT_INSERT_SQL), record)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to insert audit record: {}", e)))?;

        Ok(())
    }
}
