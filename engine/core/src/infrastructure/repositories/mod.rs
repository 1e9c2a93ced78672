// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! This module provides infrastructure implementations of repository abstractions
//! defined in the domain layer, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! Production-ready implementations backed by PostgreSQL:
//! - **PostgresAgentRepository** - Agent registry and trust scores
//! - **PostgresTaskRepository** - Task state and assignment history
//! - **PostgresTrustEventRepository** - Append-only trust-event ledger
//! - **PostgresAuditLogRepository** - Append-only audit trail
//!
//! ## In-Memory Store
//!
//! **InMemoryTrustStore** implements all four repository traits over shared
//! thread-safe maps, so the compound operations (score+event,
//! reassignment+audit) commit under one write section. Used for development
//! and testing.
//!
//! # Design Principles
//!
//! 1. **Technology Agnostic**: Domain layer has no knowledge of persistence
//! 2. **Transactional Consistency**: Compound operations are atomic
//! 3. **Error Mapping**: Infrastructure errors mapped to domain RepositoryError
//! 4. **Connection Pooling**: Efficient database connection management

pub mod postgres_agent;
pub mod postgres_audit;
pub mod postgres_task;
pub mod postgres_trust_event;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::agent::{Agent, AgentId, Protocol};
use crate::domain::audit::AuditRecord;
use crate::domain::repository::{
    AgentRepository, AuditLogRepository, RepositoryError, TaskRepository, TrustEventRepository,
};
use crate::domain::task::{Task, TaskId};
use crate::domain::trust::TrustEvent;

/// One shared in-memory store implementing every repository trait.
///
/// Clones share the underlying maps, so a daemon can hand the same store to
/// each service as four separate `Arc<dyn ...>` handles.
#[derive(Clone, Default)]
pub struct InMemoryTrustStore {
    agents: Arc<RwLock<HashMap<AgentId, Agent>>>,
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
    trust_events: Arc<RwLock<Vec<TrustEvent>>>,
    audit_log: Arc<RwLock<Vec<AuditRecord>>>,
}

impl InMemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit trail. The `AuditLogRepository` trait is
    /// write-only; tests and diagnostics read through here.
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit_log.read().unwrap().clone()
    }
}

#[async_trait]
impl AgentRepository for InMemoryTrustStore {
    async fn save(&self, agent: &Agent) -> Result<(), RepositoryError> {
        let mut agents = self.agents.write().unwrap();
        agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let agents = self.agents.read().unwrap();
        Ok(agents.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Agent>, RepositoryError> {
        let agents = self.agents.read().unwrap();
        Ok(agents.values().cloned().collect())
    }

    async fn list_active_by_protocol(
        &self,
        protocol: Protocol,
    ) -> Result<Vec<Agent>, RepositoryError> {
        let agents = self.agents.read().unwrap();
        let mut pool: Vec<Agent> = agents
            .values()
            .filter(|a| a.is_active && a.protocol == protocol)
            .cloned()
            .collect();
        pool.sort_by(|a, b| {
            b.trust_score
                .partial_cmp(&a.trust_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(pool)
    }

    async fn update_score_with_event(
        &self,
        id: AgentId,
        new_score: f64,
        event: &TrustEvent,
    ) -> Result<(), RepositoryError> {
        // Hold both write locks for the whole section so no reader sees the
        // score without its event. Lock order: agents then events.
        let mut agents = self.agents.write().unwrap();
        let mut events = self.trust_events.write().unwrap();

        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Agent {}", id)))?;
        agent.apply_score(new_score, event.created_at);
        events.push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InMemoryTrustStore {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write().unwrap();
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let tasks = self.tasks.read().unwrap();
        Ok(tasks.get(&id).cloned())
    }

    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let tasks = self.tasks.read().unwrap();
        let mut recent: Vec<Task> = tasks
            .values()
            .filter(|t| t.agent_id == agent_id && t.created_at >= since)
            .cloned()
            .collect();
        recent.sort_by_key(|t| t.created_at);
        Ok(recent)
    }

    async fn commit_reassignment(
        &self,
        id: TaskId,
        to_agent: AgentId,
        reassigned_at: DateTime<Utc>,
        audit: &AuditRecord,
    ) -> Result<(), RepositoryError> {
        // Task mutation and audit append commit together. Lock order:
        // tasks then audit log.
        let mut tasks = self.tasks.write().unwrap();
        let mut audit_log = self.audit_log.write().unwrap();

        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Task {}", id)))?;
        task.reassign(to_agent, reassigned_at);
        audit_log.push(audit.clone());
        Ok(())
    }
}

#[async_trait]
impl TrustEventRepository for InMemoryTrustStore {
    async fn insert(&self, event: &TrustEvent) -> Result<(), RepositoryError> {
        let mut events = self.trust_events.write().unwrap();
        events.push(event.clone());
        Ok(())
    }

    async fn list_recent_by_agent(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrustEvent>, RepositoryError> {
        let events = self.trust_events.read().unwrap();
        let mut recent: Vec<TrustEvent> = events
            .iter()
            .filter(|e| e.agent_id == agent_id && e.created_at >= since)
            .cloned()
            .collect();
        recent.sort_by_key(|e| e.created_at);
        Ok(recent)
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryTrustStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), RepositoryError> {
        let mut audit_log = self.audit_log.write().unwrap();
        audit_log.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::AuditAction;
    use crate::domain::trust::TrustEventType;
    use chrono::Duration;

    fn agent(name: &str, protocol: Protocol, trust: f64, active: bool) -> Agent {
        let mut agent = Agent::new(name, protocol, trust);
        agent.is_active = active;
        agent
    }

    // The store implements several traits sharing method names, so the
    // tests call through the trait paths the services use.

    #[tokio::test]
    async fn test_active_pool_is_filtered_and_sorted() {
        let store = InMemoryTrustStore::new();
        AgentRepository::save(&store, &agent("a", Protocol::Mcp, 60.0, true)).await.unwrap();
        AgentRepository::save(&store, &agent("b", Protocol::Mcp, 90.0, true)).await.unwrap();
        AgentRepository::save(&store, &agent("c", Protocol::Mcp, 75.0, false)).await.unwrap();
        AgentRepository::save(&store, &agent("d", Protocol::Nlweb, 99.0, true)).await.unwrap();

        let pool = store.list_active_by_protocol(Protocol::Mcp).await.unwrap();
        let names: Vec<&str> = pool.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_score_update_commits_with_event() {
        let store = InMemoryTrustStore::new();
        let agent = agent("a", Protocol::A2a, 50.0, true);
        let id = agent.id;
        AgentRepository::save(&store, &agent).await.unwrap();

        let now = Utc::now();
        let event = TrustEvent::new(
            id,
            12.5,
            TrustEventType::Performance,
            "routine recalculation",
            serde_json::json!({}),
            now,
        );
        store.update_score_with_event(id, 62.5, &event).await.unwrap();

        let saved = AgentRepository::find_by_id(&store, id).await.unwrap().unwrap();
        assert_eq!(saved.trust_score, 62.5);
        assert_eq!(saved.updated_at, now);

        let events = TrustEventRepository::list_recent_by_agent(
            &store,
            id,
            now - Duration::hours(1),
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delta, 12.5);
    }

    #[tokio::test]
    async fn test_score_update_unknown_agent_is_not_found() {
        let store = InMemoryTrustStore::new();
        let event = TrustEvent::new(
            AgentId::new(),
            1.0,
            TrustEventType::Performance,
            "x",
            serde_json::json!({}),
            Utc::now(),
        );
        let result = store
            .update_score_with_event(AgentId::new(), 51.0, &event)
            .await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reassignment_commits_with_audit() {
        let store = InMemoryTrustStore::new();
        let from = AgentId::new();
        let to = AgentId::new();
        let now = Utc::now();
        let task = Task::assigned_to(from, Protocol::Mcp, "inference", serde_json::json!({}), now);
        let task_id = task.id;
        TaskRepository::save(&store, &task).await.unwrap();

        let later = now + Duration::seconds(10);
        let audit = AuditRecord::new(
            Some(to),
            Some(task_id),
            AuditAction::Delegate,
            "task_reassignment",
            serde_json::json!({ "from_agent": from, "to_agent": to, "reason": "latency_exceeded" }),
            later,
        );
        store
            .commit_reassignment(task_id, to, later, &audit)
            .await
            .unwrap();

        let saved = TaskRepository::find_by_id(&store, task_id).await.unwrap().unwrap();
        assert_eq!(saved.agent_id, to);
        assert_eq!(saved.assigned_at, Some(later));

        let records = store.audit_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].task_id, Some(task_id));
    }

    #[tokio::test]
    async fn test_recent_listings_are_windowed_and_ascending() {
        let store = InMemoryTrustStore::new();
        let agent_id = AgentId::new();
        let now = Utc::now();

        for offset in [40, 10, 25] {
            let task = Task::assigned_to(
                agent_id,
                Protocol::Mcp,
                "inference",
                serde_json::json!({}),
                now - Duration::days(offset),
            );
            TaskRepository::save(&store, &task).await.unwrap();
        }

        let recent = TaskRepository::list_recent_by_agent(&store, agent_id, now - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].created_at < recent[1].created_at);
    }
}
