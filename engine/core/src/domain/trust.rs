// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0
//! # Trust Value Objects
//!
//! The append-only [`TrustEvent`] ledger plus the ephemeral values the
//! scoring pipeline passes between its stages: [`TrustMetrics`] out of the
//! aggregator, [`TriggerAdjustments`] out of the trigger evaluator, and the
//! [`ScoreWeights`] the compositor blends them with.
//!
//! Invariant: every persisted change to an agent's score is accompanied by
//! exactly one `TrustEvent` whose `delta` equals `new - previous`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustEventId(pub Uuid);

impl TrustEventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrustEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrustEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustEventType {
    Performance,
    Error,
    Security,
    Compliance,
    Timeout,
}

impl TrustEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustEventType::Performance => "performance",
            TrustEventType::Error => "error",
            TrustEventType::Security => "security",
            TrustEventType::Compliance => "compliance",
            TrustEventType::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "performance" => Some(TrustEventType::Performance),
            "error" => Some(TrustEventType::Error),
            "security" => Some(TrustEventType::Security),
            "compliance" => Some(TrustEventType::Compliance),
            "timeout" => Some(TrustEventType::Timeout),
            _ => None,
        }
    }

    /// Event type for a recomputed score: non-negative movement reads as
    /// performance, negative movement as error.
    pub fn from_delta(delta: f64) -> Self {
        if delta >= 0.0 {
            TrustEventType::Performance
        } else {
            TrustEventType::Error
        }
    }
}

impl fmt::Display for TrustEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in an agent's trust ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEvent {
    pub id: TrustEventId,
    pub agent_id: AgentId,
    pub delta: f64,
    pub event_type: TrustEventType,
    pub reason: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TrustEvent {
    pub fn new(
        agent_id: AgentId,
        delta: f64,
        event_type: TrustEventType,
        reason: impl Into<String>,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TrustEventId::new(),
            agent_id,
            delta,
            event_type,
            reason: reason.into(),
            metadata,
            created_at,
        }
    }
}

/// Derived statistics over one agent's recent task and event history.
/// Produced by the metric aggregator; pure data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustMetrics {
    /// Completed / total tasks, percent. Defaults to 50 with no history.
    pub completion_rate: f64,
    /// Failed / total tasks, percent.
    pub failure_rate: f64,
    /// Failure rate with exponential recency weighting, percent.
    pub weighted_failure_rate: f64,
    /// Mean assignment-to-completion latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Completed tasks at or under the SLA threshold.
    pub within_sla_count: u32,
    /// Completed tasks over the SLA threshold.
    pub delayed_tasks_count: u32,
    /// |success rate of the last ten tasks - success rate of the ten before|.
    pub performance_drift: f64,
    /// Share of trust events with |delta| > 10, percent.
    pub anomaly_score: f64,
    /// Decay-weighted standard deviation of the last week's deltas.
    pub trust_volatility: f64,
    /// Within-SLA / completed, percent. Defaults to 100 with no completions.
    pub sla_compliance: f64,
}

impl TrustMetrics {
    /// Baseline for an agent with no observable history.
    pub fn empty_history() -> Self {
        Self {
            completion_rate: 50.0,
            failure_rate: 0.0,
            weighted_failure_rate: 0.0,
            avg_latency_ms: 0.0,
            within_sla_count: 0,
            delayed_tasks_count: 0,
            performance_drift: 0.0,
            anomaly_score: 0.0,
            trust_volatility: 0.0,
            sla_compliance: 100.0,
        }
    }
}

/// Additive score adjustments produced by the trigger evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerAdjustments {
    pub delayed_penalty: f64,
    pub sla_bonus: f64,
    /// Names of the triggers that fired, in evaluation order.
    pub triggers_applied: Vec<String>,
}

impl TriggerAdjustments {
    pub fn none() -> Self {
        Self {
            delayed_penalty: 0.0,
            sla_bonus: 0.0,
            triggers_applied: Vec::new(),
        }
    }

    pub fn total(&self) -> f64 {
        self.delayed_penalty + self.sla_bonus
    }
}

/// Weights the compositor applies to the seven factor scores. Always passed
/// in explicitly; the canonical set is the default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub latency: f64,
    pub completion: f64,
    pub consistency: f64,
    pub failure: f64,
    pub volatility: f64,
    pub anomaly: f64,
    pub sla: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            latency: 0.20,
            completion: 0.25,
            consistency: 0.15,
            failure: 0.05,
            volatility: 0.05,
            anomaly: 0.15,
            sla: 0.15,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.latency
            + self.completion
            + self.consistency
            + self.failure
            + self.volatility
            + self.anomaly
            + self.sla
    }

    /// Weights must each sit in [0, 1] and sum to 1.
    pub fn validate(&self) -> Result<(), WeightsError> {
        let all = [
            self.latency,
            self.completion,
            self.consistency,
            self.failure,
            self.volatility,
            self.anomaly,
            self.sla,
        ];
        if let Some(w) = all.iter().find(|w| !(0.0..=1.0).contains(*w) || !w.is_finite()) {
            return Err(WeightsError::OutOfRange(*w));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    #[error("weight {0} outside [0, 1]")]
    OutOfRange(f64),

    #[error("weights sum to {0}, expected 1.0")]
    BadSum(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_delta() {
        assert_eq!(TrustEventType::from_delta(3.2), TrustEventType::Performance);
        assert_eq!(TrustEventType::from_delta(0.0), TrustEventType::Performance);
        assert_eq!(TrustEventType::from_delta(-0.1), TrustEventType::Error);
    }

    #[test]
    fn test_event_type_serde_lowercase() {
        let json = serde_json::to_string(&TrustEventType::Compliance).unwrap();
        assert_eq!(json, "\"compliance\"");
        assert_eq!(TrustEventType::parse("timeout"), Some(TrustEventType::Timeout));
    }

    #[test]
    fn test_default_weights_validate() {
        assert!(ScoreWeights::default().validate().is_ok());
    }

    #[test]
    fn test_weights_reject_bad_sum() {
        let mut weights = ScoreWeights::default();
        weights.latency = 0.5;
        assert!(matches!(weights.validate(), Err(WeightsError::BadSum(_))));
    }

    #[test]
    fn test_weights_reject_negative() {
        let mut weights = ScoreWeights::default();
        weights.failure = -0.05;
        weights.latency = 0.30;
        assert!(matches!(weights.validate(), Err(WeightsError::OutOfRange(_))));
    }

    #[test]
    fn test_empty_history_defaults() {
        let metrics = TrustMetrics::empty_history();
        assert_eq!(metrics.completion_rate, 50.0);
        assert_eq!(metrics.sla_compliance, 100.0);
        assert_eq!(metrics.trust_volatility, 0.0);
    }

    #[test]
    fn test_adjustments_total() {
        let adjustments = TriggerAdjustments {
            delayed_penalty: -15.0,
            sla_bonus: 10.0,
            triggers_applied: vec![
                "delayed_tasks_penalty".to_string(),
                "sla_compliance_bonus".to_string(),
            ],
        };
        assert_eq!(adjustments.total(), -5.0);
    }
}
