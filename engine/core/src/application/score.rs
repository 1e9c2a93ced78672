// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Score Composition
//!
//! Blends the aggregated metrics into seven factor scores, applies the
//! configured weights, adds the trigger adjustments, and clamps to [0, 100].
//! Pure arithmetic; identical inputs always produce the identical score.

use crate::domain::agent::clamp_trust_score;
use crate::domain::config::TrustConfig;
use crate::domain::trust::{ScoreWeights, TriggerAdjustments, TrustMetrics};

/// The seven factor scores, each already normalized into [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct FactorScores {
    pub latency: f64,
    pub completion: f64,
    pub consistency: f64,
    pub failure: f64,
    pub volatility: f64,
    pub anomaly: f64,
    pub sla: f64,
}

/// Combines metrics and trigger adjustments into one bounded trust score.
///
/// Weights arrive through configuration at construction time; nothing here
/// reads module state, so alternative weightings are a constructor away.
pub struct ScoreCompositor {
    weights: ScoreWeights,
    sla_threshold_ms: i64,
}

impl ScoreCompositor {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            weights: config.weights,
            sla_threshold_ms: config.sla_threshold_ms,
        }
    }

    /// Compositor with an explicit weight set, for callers that score the
    /// same metrics under more than one weighting.
    pub fn with_weights(weights: ScoreWeights, sla_threshold_ms: i64) -> Self {
        Self {
            weights,
            sla_threshold_ms,
        }
    }

    /// Normalize raw metrics into the seven factor scores.
    ///
    /// Latency degrades linearly: an average latency equal to the SLA
    /// threshold costs 50 points, twice the threshold costs all 100.
    pub fn factor_scores(&self, metrics: &TrustMetrics) -> FactorScores {
        FactorScores {
            latency: (100.0
                - (metrics.avg_latency_ms / self.sla_threshold_ms as f64) * 50.0)
                .max(0.0),
            completion: metrics.completion_rate,
            consistency: (100.0 - metrics.performance_drift * 2.0).max(0.0),
            failure: (100.0 - metrics.weighted_failure_rate * 2.0).max(0.0),
            volatility: (100.0 - metrics.trust_volatility * 5.0).max(0.0),
            anomaly: (100.0 - metrics.anomaly_score).max(0.0),
            sla: metrics.sla_compliance,
        }
    }

    /// Weighted base score before trigger adjustments.
    pub fn base_score(&self, metrics: &TrustMetrics) -> f64 {
        let factors = self.factor_scores(metrics);
        factors.latency * self.weights.latency
            + factors.completion * self.weights.completion
            + factors.consistency * self.weights.consistency
            + factors.failure * self.weights.failure
            + factors.volatility * self.weights.volatility
            + factors.anomaly * self.weights.anomaly
            + factors.sla * self.weights.sla
    }

    /// Final score: weighted base plus additive adjustments, clamped.
    pub fn compose(&self, metrics: &TrustMetrics, adjustments: &TriggerAdjustments) -> f64 {
        clamp_trust_score(self.base_score(metrics) + adjustments.total())
    }
}
