// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Task Assignment Use Case
//!
//! Routes new work to the most trusted active agent on the requested
//! protocol. This is where the trust score earns its keep: assignment is
//! best-based, unlike reassignment's rank-based rotation.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Agent selection + task creation + audit trail
//! - **Collaborators:**
//!   - Domain: Agent and Task aggregates, AuditRecord
//!   - Infrastructure: AgentRepository, TaskRepository, AuditLogRepository,
//!     EventBus

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::agent::{Agent, Protocol};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::error::TrustEngineError;
use crate::domain::events::RoutingEvent;
use crate::domain::repository::{AgentRepository, AuditLogRepository, TaskRepository};
use crate::domain::task::{Task, TaskId, TaskStatus};
use crate::infrastructure::event_bus::EventBus;

/// Task assignment request.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AssignTaskRequest {
    /// Protocol the task must run over
    pub protocol: Protocol,

    /// Task category (free-form, e.g. "inference", "translation")
    pub task_type: String,

    /// Opaque task input handed to the agent
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Assigned task response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AssignedTask {
    pub task_id: TaskId,
    /// The agent that won the assignment
    pub agent: Agent,
    pub status: TaskStatus,
}

/// Task Assignment Use Case
#[async_trait]
pub trait TaskAssignmentService: Send + Sync {
    /// Assign a new task to the highest-trust active agent on the protocol.
    ///
    /// # Errors
    ///
    /// - Validation: empty task_type
    /// - NoAgentsAvailable: no active agents on the requested protocol
    /// - Store: repository failure, propagated verbatim
    async fn assign(&self, request: AssignTaskRequest) -> Result<AssignedTask, TrustEngineError>;
}

/// Standard implementation of TaskAssignmentService
pub struct StandardTaskAssignmentService {
    agents: Arc<dyn AgentRepository>,
    tasks: Arc<dyn TaskRepository>,
    audit_log: Arc<dyn AuditLogRepository>,
    event_bus: Arc<EventBus>,
}

impl StandardTaskAssignmentService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        tasks: Arc<dyn TaskRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            agents,
            tasks,
            audit_log,
            event_bus,
        }
    }
}

#[async_trait]
impl TaskAssignmentService for StandardTaskAssignmentService {
    async fn assign(&self, request: AssignTaskRequest) -> Result<AssignedTask, TrustEngineError> {
        if request.task_type.trim().is_empty() {
            return Err(TrustEngineError::Validation(
                "task_type cannot be empty".to_string(),
            ));
        }

        // Step 1: best agent wins; the pool arrives sorted by trust desc
        let pool = self
            .agents
            .list_active_by_protocol(request.protocol)
            .await?;
        let selected = pool
            .into_iter()
            .next()
            .ok_or(TrustEngineError::NoAgentsAvailable(request.protocol))?;

        // Step 2: create the task already assigned
        let now = Utc::now();
        let task = Task::assigned_to(
            selected.id,
            request.protocol,
            request.task_type.clone(),
            request.payload.clone(),
            now,
        );
        self.tasks.save(&task).await?;

        // Step 3: audit trail
        self.audit_log
            .insert(&AuditRecord::new(
                Some(selected.id),
                Some(task.id),
                AuditAction::Delegate,
                "task_assignment",
                serde_json::json!({
                    "protocol": request.protocol,
                    "task_type": request.task_type,
                    "agent_name": selected.name,
                }),
                now,
            ))
            .await?;

        // Step 4: publish domain event
        self.event_bus
            .publish_routing_event(RoutingEvent::TaskAssigned {
                task_id: task.id,
                agent_id: selected.id,
                task_type: request.task_type,
                assigned_at: now,
            });

        info!(
            task_id = %task.id,
            agent_id = %selected.id,
            protocol = %request.protocol,
            trust = selected.trust_score,
            "Task assigned"
        );

        Ok(AssignedTask {
            task_id: task.id,
            agent: selected,
            status: task.status,
        })
    }
}
