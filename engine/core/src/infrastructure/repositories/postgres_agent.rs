// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! Production `AgentRepository` implementation backed by the `agents` table
//! in PostgreSQL via `sqlx`.
//!
//! Expected schema (managed externally):
//! `agents(id uuid primary key, name text, protocol text,
//! trust_score double precision, is_active boolean,
//! created_at timestamptz, updated_at timestamptz)`

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{Agent, AgentId, Protocol};
use crate::domain::repository::{AgentRepository, RepositoryError};
use crate::domain::trust::TrustEvent;

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_agent(row: &PgRow) -> Result<Agent, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let name: String = row.get("name");
    let protocol_str: String = row.get("protocol");
    let trust_score: f64 = row.get("trust_score");
    let is_active: bool = row.get("is_active");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");

    let protocol: Protocol = protocol_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown protocol: {}", protocol_str)))?;

    Ok(Agent {
        id: AgentId(id),
        name,
        protocol,
        trust_score,
        is_active,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO agents (
                id, name, protocol, trust_score, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                protocol = EXCLUDED.protocol,
                trust_score = EXCLUDED.trust_score,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(agent.id.0)
        .bind(&agent.name)
        .bind(agent.protocol.as_str())
        .bind(agent.trust_score)
        .bind(agent.is_active)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save agent: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, protocol, trust_score, is_active, created_at, updated_at
            FROM agents
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(map_agent).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, protocol, trust_score, is_active, created_at, updated_at
            FROM agents
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(map_agent).collect()
    }

    async fn list_active_by_protocol(
        &self,
        protocol: Protocol,
    ) -> Result<Vec<Agent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, protocol, trust_score, is_active, created_at, updated_at
            FROM agents
            WHERE protocol = $1 AND is_active = TRUE
            ORDER BY trust_score DESC
            "#,
        )
        .bind(protocol.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(map_agent).collect()
    }

    async fn update_score_with_event(
        &self,
        id: AgentId,
        new_score: f64,
        event: &TrustEvent,
    ) -> Result<(), RepositoryError> {
        // Score write and ledger append commit in one transaction.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let updated = sqlx::query(
            r#"
            UPDATE agents
            SET trust_score = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(new_score)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update score: {}", e)))?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Agent {}", id)));
        }

        sqlx::query(
            r#"
            INSERT INTO trust_events (
                id, agent_id, delta, event_type, reason, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id.0)
        .bind(event.agent_id.0)
        .bind(event.delta)
        .bind(event.event_type.as_str())
        .bind(&event.reason)
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to record trust event: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }
}
