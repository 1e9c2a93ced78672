// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Trust Event Repository
//!
//! Production `TrustEventRepository` implementation over the append-only
//! `trust_events` table. Rows are never updated or deleted.
//!
//! Expected schema (managed externally):
//! `trust_events(id uuid primary key, agent_id uuid, delta double precision,
//! event_type text, reason text, metadata jsonb, created_at timestamptz)`

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::AgentId;
use crate::domain::repository::{RepositoryError, TrustEventRepository};
use crate::domain::trust::{TrustEvent, TrustEventId, TrustEventType};

pub struct PostgresTrustEventRepository {
    pool: PgPool,
}

impl PostgresTrustEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_event(row: &PgRow) -> Result<TrustEvent, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let agent_id: uuid::Uuid = row.get("agent_id");
    let delta: f64 = row.get("delta");
    let event_type_str: String = row.get("event_type");
    let reason: String = row.get("reason");
    let metadata: serde_json::Value = row.get("metadata");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    let event_type = TrustEventType::parse(&event_type_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown event type: {}", event_type_str))
    })?;

    Ok(TrustEvent {
        id: TrustEventId(id),
        agent_id: AgentId(agent_id),
        delta,
        event_type,
        reason,
        metadata,
        created_at,
    })
}

#[async_trait]
impl TrustEventRepository for PostgresTrustEventRepository {
    async fn insert(&self, event: &TrustEvent) -> Result<(), RepositoryError> {
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
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert trust event: {}", e)))?;

        Ok(())
    }

    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<TrustEvent>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, delta, event_type, reason, metadata, created_at
            FROM trust_events
            WHERE agent_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(agent_id.0)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(map_event).collect()
    }
}
