// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! Audit trail records for assignment, reassignment, and manual score
//! adjustments. Formatting and retention of the log are external concerns;
//! the engine only appends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Work handed to an agent (assignment or reassignment).
    Delegate,
    /// Trust policy re-evaluated an agent's standing (manual delta).
    PolicyReeval,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Delegate => "delegate",
            AuditAction::PolicyReeval => "policy_reeval",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "delegate" => Some(AuditAction::Delegate),
            "policy_reeval" => Some(AuditAction::PolicyReeval),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub agent_id: Option<AgentId>,
    pub task_id: Option<TaskId>,
    pub action: AuditAction,
    pub resource: String,
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        agent_id: Option<AgentId>,
        task_id: Option<TaskId>,
        action: AuditAction,
        resource: impl Into<String>,
        payload: serde_json::Value,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            task_id,
            action,
            resource: resource.into(),
            payload,
            recorded_at,
        }
    }
}
