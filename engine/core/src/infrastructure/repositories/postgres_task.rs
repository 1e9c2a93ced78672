// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Task Repository
//!
//! Production `TaskRepository` implementation backed by the `tasks` table.
//!
//! Expected schema (managed externally):
//! `tasks(id uuid primary key, agent_id uuid, protocol text,
//! task_type text, payload jsonb, status text, created_at timestamptz,
//! assigned_at timestamptz, completed_at timestamptz)`

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{AgentId, Protocol};
use crate::domain::audit::AuditRecord;
use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::{Task, TaskId, TaskStatus};

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_task(row: &PgRow) -> Result<Task, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let agent_id: uuid::Uuid = row.get("agent_id");
    let protocol_str: String = row.get("protocol");
    let task_type: String = row.get("task_type");
    let payload: serde_json::Value = row.get("payload");
    let status_str: String = row.get("status");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let assigned_at: Option<chrono::DateTime<chrono::Utc>> = row.get("assigned_at");
    let completed_at: Option<chrono::DateTime<chrono::Utc>> = row.get("completed_at");

    let protocol: Protocol = protocol_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown protocol: {}", protocol_str)))?;
    let status = TaskStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Serialization(format!("Unknown status: {}", status_str)))?;

    Ok(Task {
        id: TaskId(id),
        agent_id: AgentId(agent_id),
        protocol,
        task_type,
        payload,
        status,
        created_at,
        assigned_at,
        completed_at,
    })
}

pub(crate) fn bind_audit_insert<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    record: &'q AuditRecord,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(record.id)
        .bind(record.agent_id.map(|a| a.0))
        .bind(record.task_id.map(|t| t.0))
        .bind(record.action.as_str())
        .bind(&record.resource)
        .bind(&record.payload)
        .bind(record.recorded_at)
}

pub(crate) const AUDIT_INSERT_SQL: &str = r#"
    INSERT INTO audit_logs (
        id, agent_id, task_id, action_type, resource, payload, recorded_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    "#;

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, agent_id, protocol, task_type, payload, status,
                created_at, assigned_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                agent_id = EXCLUDED.agent_id,
                protocol = EXCLUDED.protocol,
                task_type = EXCLUDED.task_type,
                payload = EXCLUDED.payload,
                status = EXCLUDED.status,
                assigned_at = EXCLUDED.assigned_at,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(task.id.0)
        .bind(task.agent_id.0)
        .bind(task.protocol.as_str())
        .bind(&task.task_type)
        .bind(&task.payload)
        .bind(task.status.as_str())
        .bind(task.created_at)
        .bind(task.assigned_at)
        .bind(task.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save task: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, agent_id, protocol, task_type, payload, status,
                   created_at, assigned_at, completed_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(map_task).transpose()
    }

    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, protocol, task_type, payload, status,
                   created_at, assigned_at, completed_at
            FROM tasks
            WHERE agent_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(agent_id.0)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(map_task).collect()
    }

    async fn commit_reassignment(
        &self,
        id: TaskId,
        to_agent: AgentId,
        reassigned_at: chrono::DateTime<chrono::Utc>,
        audit: &AuditRecord,
    ) -> Result<(), RepositoryError> {
        // Handoff and audit record commit in one transaction.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE tasks
            SET agent_id = $2, assigned_at = $3, status = 'assigned'
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(to_agent.0)
        .bind(reassigned_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to reassign task: {}", e)))?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Task {}", id)));
        }

        bind_audit_insert(sqlx::query(AUDIT_INSERT_SQL), audit)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to record audit entry: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }
}
