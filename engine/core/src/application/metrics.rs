// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Metric Aggregation
//!
//! Derives per-agent statistics from raw task and trust-event history.
//!
//! # DDD Pattern: Domain Service (pure)
//!
//! - **Layer:** Application
//! - **Responsibility:** Turn a 30-day task/event window into a `TrustMetrics` view
//! - **Collaborators:** none; operates on slices the caller already fetched

use chrono::{DateTime, Duration, Utc};

use crate::domain::config::TrustConfig;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::trust::{TrustEvent, TrustMetrics};

/// Decay constant for failure weighting: a task seven days old carries
/// weight 1/e relative to a task observed just now.
const FAILURE_DECAY_SECS: f64 = 7.0 * 86_400.0;

/// Decay constant for volatility weighting (one day).
const VOLATILITY_DECAY_SECS: f64 = 86_400.0;

/// Number of tasks per slice when comparing recent vs. prior success rate.
const DRIFT_SLICE: usize = 10;

/// Trust events with |delta| above this magnitude count as anomalous swings.
const ANOMALY_DELTA: f64 = 10.0;

/// Computes derived statistics over an agent's recent history.
///
/// All methods are pure: identical inputs produce identical outputs and no
/// I/O is performed. Input slices must be ordered oldest-first, which is the
/// ordering the repository ports guarantee.
pub struct MetricAggregator {
    sla_threshold_ms: i64,
}

impl MetricAggregator {
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            sla_threshold_ms: config.sla_threshold_ms,
        }
    }

    /// Aggregate the full metric view for one agent.
    ///
    /// Empty history is not an error: with zero tasks and zero events the
    /// result degrades to the documented neutral defaults (completion 50,
    /// SLA compliance 100, everything else 0).
    pub fn compute(
        &self,
        tasks: &[Task],
        events: &[TrustEvent],
        now: DateTime<Utc>,
    ) -> TrustMetrics {
        let total = tasks.len();
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let failed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count();

        // Neutral default when there is nothing to judge the agent by.
        let completion_rate = if total == 0 {
            50.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        let failure_rate = if total == 0 {
            0.0
        } else {
            failed as f64 / total as f64 * 100.0
        };

        let latencies: Vec<i64> = tasks.iter().filter_map(|t| t.latency_ms()).collect();
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<i64>() as f64 / latencies.len() as f64
        };

        let mut within_sla_count = 0u32;
        let mut delayed_tasks_count = 0u32;
        for task in tasks {
            if task.status != TaskStatus::Completed {
                continue;
            }
            if let Some(latency) = task.latency_ms() {
                if latency <= self.sla_threshold_ms {
                    within_sla_count += 1;
                } else {
                    delayed_tasks_count += 1;
                }
            }
        }
        // No completions yet reads as compliant, not punitive.
        let sla_compliance = if completed == 0 {
            100.0
        } else {
            within_sla_count as f64 / completed as f64 * 100.0
        };

        TrustMetrics {
            completion_rate,
            failure_rate,
            weighted_failure_rate: weighted_failure_rate(tasks, now),
            avg_latency_ms,
            within_sla_count,
            delayed_tasks_count,
            performance_drift: performance_drift(tasks),
            anomaly_score: anomaly_score(events),
            trust_volatility: trust_volatility(events, now),
            sla_compliance,
        }
    }
}

/// Failure ratio where each task is weighted by `exp(-age / 7 days)`, so a
/// failure yesterday moves the needle far more than one three weeks ago.
fn weighted_failure_rate(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let mut weighted_total = 0.0;
    let mut weighted_failed = 0.0;
    for task in tasks {
        let age_secs = (now - task.created_at).num_seconds().max(0) as f64;
        let weight = (-age_secs / FAILURE_DECAY_SECS).exp();
        weighted_total += weight;
        if task.status == TaskStatus::Failed {
            weighted_failed += weight;
        }
    }
    if weighted_total <= f64::EPSILON {
        0.0
    } else {
        weighted_failed / weighted_total * 100.0
    }
}

/// Absolute difference between the success rate of the most recent ten
/// tasks and the ten before those. Measures behavioral consistency, not
/// absolute quality; an agent that is reliably bad drifts by zero.
fn performance_drift(tasks: &[Task]) -> f64 {
    let recent_start = tasks.len().saturating_sub(DRIFT_SLICE);
    if recent_start == 0 {
        // Not enough history for a prior slice to compare against.
        return 0.0;
    }
    let prev_start = recent_start.saturating_sub(DRIFT_SLICE);
    let recent = success_rate(&tasks[recent_start..]);
    let previous = success_rate(&tasks[prev_start..recent_start]);
    (recent - previous).abs()
}

fn success_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// Share of trust events whose delta magnitude exceeds the anomaly cutoff.
fn anomaly_score(events: &[TrustEvent]) -> f64 {
    let outliers = events
        .iter()
        .filter(|e| e.delta.abs() > ANOMALY_DELTA)
        .count();
    outliers as f64 / events.len().max(1) as f64 * 100.0
}

/// Decay-weighted population standard deviation of the last seven days of
/// trust-event deltas. Mean and variance use the same weights.
fn trust_volatility(events: &[TrustEvent], now: DateTime<Utc>) -> f64 {
    let mut weights = Vec::new();
    let mut deltas = Vec::new();
    for event in events {
        let age = now - event.created_at;
        if age > Duration::days(7) {
            continue;
        }
        let age_secs = age.num_seconds().max(0) as f64;
        weights.push((-age_secs / VOLATILITY_DECAY_SECS).exp());
        deltas.push(event.delta);
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= f64::EPSILON {
        return 0.0;
    }
    let mean = weights
        .iter()
        .zip(&deltas)
        .map(|(w, d)| w * d)
        .sum::<f64>()
        / weight_sum;
    let variance = weights
        .iter()
        .zip(&deltas)
        .map(|(w, d)| w * (d - mean).powi(2))
        .sum::<f64>()
        / weight_sum;
    variance.sqrt()
}
