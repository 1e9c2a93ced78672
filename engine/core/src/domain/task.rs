// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Task Aggregate
//!
//! A unit of work routed to one agent. Status transitions to
//! completed/failed/cancelled happen outside the engine; the engine itself
//! mutates only `agent_id`, `assigned_at`, and `status` during reassignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::{AgentId, Protocol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "assigned" => Some(TaskStatus::Assigned),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub agent_id: AgentId,
    /// Protocol the task was routed over; the reassignment pool is drawn
    /// from active agents on the same protocol.
    pub protocol: Protocol,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task already assigned to an agent.
    pub fn assigned_to(
        agent_id: AgentId,
        protocol: Protocol,
        task_type: impl Into<String>,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            agent_id,
            protocol,
            task_type: task_type.into(),
            payload,
            status: TaskStatus::Assigned,
            created_at: now,
            assigned_at: Some(now),
            completed_at: None,
        }
    }

    /// Assignment-to-completion latency in milliseconds, when both
    /// timestamps are present.
    pub fn latency_ms(&self) -> Option<i64> {
        match (self.assigned_at, self.completed_at) {
            (Some(assigned), Some(completed)) => {
                Some((completed - assigned).num_milliseconds())
            }
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Hand the task to another agent. Resets the assignment clock and
    /// returns the task to the assigned state.
    pub fn reassign(&mut self, to_agent: AgentId, at: DateTime<Utc>) {
        self.agent_id = to_agent;
        self.assigned_at = Some(at);
        self.status = TaskStatus::Assigned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_latency_requires_both_timestamps() {
        let now = Utc::now();
        let mut task = Task::assigned_to(
            AgentId::new(),
            Protocol::Mcp,
            "verification",
            serde_json::json!({}),
            now,
        );
        assert_eq!(task.latency_ms(), None);

        task.completed_at = Some(now + Duration::minutes(6));
        assert_eq!(task.latency_ms(), Some(360_000));
    }

    #[test]
    fn test_reassign_resets_clock_and_status() {
        let now = Utc::now();
        let mut task = Task::assigned_to(
            AgentId::new(),
            Protocol::Nlweb,
            "coordination",
            serde_json::json!({}),
            now,
        );
        task.status = TaskStatus::InProgress;

        let other = AgentId::new();
        let later = now + Duration::seconds(30);
        task.reassign(other, later);

        assert_eq!(task.agent_id, other);
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_at, Some(later));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TaskStatus::parse("cancelled"), Some(TaskStatus::Cancelled));
        assert_eq!(TaskStatus::parse("unknown"), None);
    }
}
