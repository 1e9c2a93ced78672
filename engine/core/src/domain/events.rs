// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::task::TaskId;

/// Scoring-side domain events: every mutation of an agent's trust score
/// emits exactly one of these after the store commit succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScoringEvent {
    TrustRecalculated {
        agent_id: AgentId,
        previous_score: f64,
        new_score: f64,
        delta: f64,
        reason: String,
        recalculated_at: DateTime<Utc>,
    },
    TrustDeltaApplied {
        agent_id: AgentId,
        requested_delta: f64,
        applied_delta: f64,
        new_score: f64,
        applied_at: DateTime<Utc>,
    },
    AgentFlagged {
        agent_id: AgentId,
        occurrences: u32,
        current_score: f64,
        threshold: f64,
        flagged_at: DateTime<Utc>,
    },
}

/// Routing-side domain events emitted when work changes hands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoutingEvent {
    TaskAssigned {
        task_id: TaskId,
        agent_id: AgentId,
        task_type: String,
        assigned_at: DateTime<Utc>,
    },
    TaskReassigned {
        task_id: TaskId,
        from_agent: AgentId,
        to_agent: AgentId,
        reason: String,
        reassigned_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // ── ScoringEvent serialization ────────────────────────────────────────────

    #[test]
    fn test_trust_recalculated_serialization() {
        let agent_id = AgentId::new();
        let event = ScoringEvent::TrustRecalculated {
            agent_id,
            previous_score: 72.0,
            new_score: 68.5,
            delta: -3.5,
            reason: "routine recalculation".to_string(),
            recalculated_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ScoringEvent = serde_json::from_str(&json).unwrap();
        if let ScoringEvent::TrustRecalculated { agent_id: id, delta, .. } = deserialized {
            assert_eq!(id, agent_id);
            assert_eq!(delta, -3.5);
        } else {
            panic!("unexpected variant");
        }
    }

    #[test]
    fn test_agent_flagged_serialization() {
        let event = ScoringEvent::AgentFlagged {
            agent_id: AgentId::new(),
            occurrences: 3,
            current_score: 61.0,
            threshold: 70.0,
            flagged_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("AgentFlagged"));
    }

    // ── RoutingEvent serialization ────────────────────────────────────────────

    #[test]
    fn test_task_reassigned_serialization() {
        let task_id = TaskId::new();
        let event = RoutingEvent::TaskReassigned {
            task_id,
            from_agent: AgentId::new(),
            to_agent: AgentId::new(),
            reason: "trust_drop".to_string(),
            reassigned_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: RoutingEvent = serde_json::from_str(&json).unwrap();
        if let RoutingEvent::TaskReassigned { task_id: id, reason, .. } = deserialized {
            assert_eq!(id, task_id);
            assert_eq!(reason, "trust_drop");
        } else {
            panic!("unexpected variant");
        }
    }
}
