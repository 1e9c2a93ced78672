// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Task Reassignment Use Case
//!
//! Decides, per in-flight task, whether the assigned agent should be
//! replaced, and performs the handoff.
//!
//! # DDD Pattern: Application Service
//!
//! State machine per evaluation:
//! `Assigned -> { Completed, NoReassignment, Reassigned }`
//!
//! - **Layer:** Application
//! - **Responsibility:** Latency circuit-breaker + trust-drop detection +
//!   next-agent selection + atomic handoff
//! - **Collaborators:**
//!   - Domain: Task and Agent aggregates, TrustEvent ledger, AuditRecord
//!   - Infrastructure: TaskRepository, AgentRepository,
//!     TrustEventRepository, KeyedLockRegistry, EventBus

use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::agent::Agent;
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::config::ReassignmentConfig;
use crate::domain::error::TrustEngineError;
use crate::domain::events::RoutingEvent;
use crate::domain::repository::{AgentRepository, TaskRepository, TrustEventRepository};
use crate::domain::task::TaskId;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::keyed_lock::KeyedLockRegistry;

/// Reassignment reason when the assignment sat too long without completing.
pub const LATENCY_EXCEEDED: &str = "latency_exceeded";

/// Reassignment reason when the agent's trust collapsed since assignment.
/// Takes precedence over [`LATENCY_EXCEEDED`] when both hold.
pub const TRUST_DROP: &str = "trust_drop";

/// Terminal decision for one evaluation pass.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReassignmentOutcome {
    /// Task already completed; nothing to evaluate.
    Completed,
    /// Neither condition held; the current agent keeps the task.
    NoReassignment,
    /// Task handed to the next agent in the trust ranking.
    Reassigned { new_agent: Agent, reason: String },
}

/// Task Reassignment Use Case
#[async_trait]
pub trait ReassignmentService: Send + Sync {
    /// Evaluate one task and reassign it if warranted.
    ///
    /// # Arguments
    ///
    /// * `task_id` - Task to evaluate
    ///
    /// # Returns
    ///
    /// The terminal state of this evaluation; `Reassigned` carries the new
    /// agent and the winning reason
    ///
    /// # Errors
    ///
    /// - TaskNotFound: no task with that id
    /// - NoAgentsAvailable: reassignment warranted but the protocol pool is
    ///   empty
    /// - Store: repository failure, propagated verbatim
    async fn evaluate(&self, task_id: TaskId) -> Result<ReassignmentOutcome, TrustEngineError>;
}

/// Standard implementation of ReassignmentService
pub struct StandardReassignmentService {
    tasks: Arc<dyn TaskRepository>,
    agents: Arc<dyn AgentRepository>,
    trust_events: Arc<dyn TrustEventRepository>,
    task_locks: Arc<KeyedLockRegistry>,
    event_bus: Arc<EventBus>,
    config: ReassignmentConfig,
}

impl StandardReassignmentService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        agents: Arc<dyn AgentRepository>,
        trust_events: Arc<dyn TrustEventRepository>,
        task_locks: Arc<KeyedLockRegistry>,
        event_bus: Arc<EventBus>,
        config: ReassignmentConfig,
    ) -> Self {
        Self {
            tasks,
            agents,
            trust_events,
            task_locks,
            event_bus,
            config,
        }
    }
}

#[async_trait]
impl ReassignmentService for StandardReassignmentService {
    async fn evaluate(&self, task_id: TaskId) -> Result<ReassignmentOutcome, TrustEngineError> {
        // Per-task mutual exclusion: two concurrent evaluations of the same
        // task must not both decide to reassign it.
        let _guard = self.task_locks.lock(task_id.0).await;

        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or(TrustEngineError::TaskNotFound(task_id))?;

        // Step 1: completed tasks are terminal
        if task.is_completed() {
            return Ok(ReassignmentOutcome::Completed);
        }

        let now = Utc::now();

        // Step 2: latency circuit-breaker. A task that was never stamped
        // with an assignment time reads as over-latency, not unmeasurable.
        let latency_exceeded = match task.assigned_at {
            Some(assigned_at) => {
                (now - assigned_at).num_milliseconds() > self.config.latency_threshold_ms
            }
            None => true,
        };

        // Step 3: cumulative trust movement of the holding agent since the
        // assignment. Wins over the latency reason when both hold.
        let since = task.assigned_at.unwrap_or(task.created_at);
        let events = self
            .trust_events
            .list_recent_by_agent(task.agent_id, since)
            .await?;
        let total_delta: f64 = events.iter().map(|e| e.delta).sum();
        let trust_dropped = total_delta <= self.config.trust_drop_threshold;

        let reason = if trust_dropped {
            TRUST_DROP
        } else if latency_exceeded {
            LATENCY_EXCEEDED
        } else {
            return Ok(ReassignmentOutcome::NoReassignment);
        };

        // Step 4: pick the next agent after the current one in descending
        // trust order, wrapping to the top when the current agent is last or
        // absent from the pool. Rank-based, not best-based: the strongest
        // candidate is chosen only via the wrap.
        let pool = self.agents.list_active_by_protocol(task.protocol).await?;
        if pool.is_empty() {
            warn!(
                task_id = %task_id,
                protocol = %task.protocol,
                reason,
                "Reassignment warranted but no active agents on protocol"
            );
            return Err(TrustEngineError::NoAgentsAvailable(task.protocol));
        }
        let next_agent = match pool.iter().position(|a| a.id == task.agent_id) {
            Some(i) if i + 1 < pool.len() => pool[i + 1].clone(),
            _ => pool[0].clone(),
        };

        // Step 5: atomic handoff. Task mutation and audit record commit
        // together or not at all.
        let audit = AuditRecord::new(
            Some(next_agent.id),
            Some(task_id),
            AuditAction::Delegate,
            "task_reassignment",
            serde_json::json!({
                "from_agent": task.agent_id,
                "to_agent": next_agent.id,
                "reason": reason,
            }),
            now,
        );
        self.tasks
            .commit_reassignment(task_id, next_agent.id, now, &audit)
            .await?;

        // Step 6: publish domain event
        self.event_bus
            .publish_routing_event(RoutingEvent::TaskReassigned {
                task_id,
                from_agent: task.agent_id,
                to_agent: next_agent.id,
                reason: reason.to_string(),
                reassigned_at: now,
            });

        counter!("trust_reassignments_total", "reason" => reason).increment(1);
        info!(
            task_id = %task_id,
            from = %task.agent_id,
            to = %next_agent.id,
            reason,
            "Task reassigned"
        );

        Ok(ReassignmentOutcome::Reassigned {
            new_agent: next_agent,
            reason: reason.to_string(),
        })
    }
}
