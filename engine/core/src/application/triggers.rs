// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Trigger Evaluation
//!
//! Discrete rule conditions over the last few minutes of task activity.
//! Where the metric aggregator smooths a month of history into continuous
//! statistics, the triggers react to what just happened: a burst of delayed
//! tasks knocks the score down immediately, a streak of on-time completions
//! lifts it. Adjustments are additive on top of the weighted base score.

use chrono::{DateTime, Duration, Utc};

use crate::domain::config::TriggerConfig;
use crate::domain::task::{Task, TaskStatus};
use crate::domain::trust::TriggerAdjustments;

/// Trigger name recorded when the delayed-tasks penalty fires.
pub const DELAYED_TASKS_PENALTY: &str = "delayed_tasks_penalty";

/// Trigger name recorded when the SLA-compliance bonus fires.
pub const SLA_COMPLIANCE_BONUS: &str = "sla_compliance_bonus";

/// Evaluates the discrete trigger rules for one agent.
///
/// Pure over its inputs; the window cut uses the `now` passed in, never the
/// wall clock, so evaluations are reproducible in tests.
pub struct TriggerEvaluator {
    window: Duration,
    delayed_latency_ms: i64,
    delayed_task_threshold: u32,
    delayed_penalty: f64,
    sla_bonus_threshold: u32,
    sla_bonus: f64,
}

impl TriggerEvaluator {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            window: Duration::seconds(config.window_secs),
            delayed_latency_ms: config.delayed_latency_ms,
            delayed_task_threshold: config.delayed_task_threshold,
            delayed_penalty: config.delayed_penalty,
            sla_bonus_threshold: config.sla_bonus_threshold,
            sla_bonus: config.sla_bonus,
        }
    }

    /// Evaluate both rules over the tasks created inside the window.
    ///
    /// The input may be any superset of the window (callers hand over the
    /// same slice the aggregator consumed); tasks created before
    /// `now - window` are skipped here.
    ///
    /// The two rules are independent: both may fire in one pass, and the
    /// penalty counts any over-latency task regardless of status while the
    /// bonus counts only completed tasks.
    pub fn evaluate(&self, tasks: &[Task], now: DateTime<Utc>) -> TriggerAdjustments {
        let cutoff = now - self.window;

        let mut delayed = 0u32;
        let mut on_time_completed = 0u32;
        for task in tasks {
            if task.created_at < cutoff {
                continue;
            }
            match task.latency_ms() {
                Some(latency) if latency > self.delayed_latency_ms => delayed += 1,
                Some(_) if task.status == TaskStatus::Completed => on_time_completed += 1,
                _ => {}
            }
        }

        let mut adjustments = TriggerAdjustments::none();
        if delayed >= self.delayed_task_threshold {
            adjustments.delayed_penalty = self.delayed_penalty;
            adjustments
                .triggers_applied
                .push(DELAYED_TASKS_PENALTY.to_string());
        }
        if on_time_completed >= self.sla_bonus_threshold {
            adjustments.sla_bonus = self.sla_bonus;
            adjustments
                .triggers_applied
                .push(SLA_COMPLIANCE_BONUS.to_string());
        }
        adjustments
    }
}
