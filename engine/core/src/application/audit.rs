// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Trust Audit Use Case
//!
//! Retrospective analysis of the trust-event ledger: flagging agents whose
//! score repeatedly dipped below threshold, and decomposing a score
//! trajectory into trend, seasonal, and residual components.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Backward trajectory reconstruction + dip counting;
//!   sliding-window decomposition over the forward trajectory
//! - **Collaborators:**
//!   - Domain: Agent aggregate, TrustEvent ledger
//!   - Infrastructure: AgentRepository, TrustEventRepository, EventBus

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::warn;

use crate::domain::agent::AgentId;
use crate::domain::config::TrustConfig;
use crate::domain::error::TrustEngineError;
use crate::domain::events::ScoringEvent;
use crate::domain::repository::{AgentRepository, TrustEventRepository};
use crate::domain::trust::TrustEvent;
use crate::infrastructure::event_bus::EventBus;

/// One agent flagged by the audit.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FlaggedAgent {
    pub agent_id: AgentId,
    pub agent_name: String,
    /// Sub-threshold negative dips found in the lookback window
    pub occurrences: u32,
    pub current_score: f64,
}

/// Audit result over every registered agent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrustAuditReport {
    pub flagged_agents: Vec<FlaggedAgent>,
    pub threshold: f64,
}

/// One point of a reconstructed score trajectory.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrustDataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Additive decomposition of one sliding window of the trajectory.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WindowDecomposition {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

/// Trend analysis result for one agent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrendReport {
    pub agent_id: AgentId,
    pub current_score: f64,
    /// Points in the reconstructed trajectory
    pub series_len: usize,
    pub windows: Vec<WindowDecomposition>,
}

/// Trust Audit Use Case
#[async_trait]
pub trait TrustAuditService: Send + Sync {
    /// Flag agents with repeated sub-threshold score dips in the lookback
    /// window.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Score below which a negative swing counts as a dip;
    ///   the configured default (70) when absent
    ///
    /// # Errors
    ///
    /// - Validation: threshold outside [0, 100]
    /// - Store: repository failure, propagated verbatim
    async fn audit(&self, threshold: Option<f64>) -> Result<TrustAuditReport, TrustEngineError>;

    /// Decompose one agent's recent score trajectory.
    ///
    /// # Arguments
    ///
    /// * `freq` - Cycle length, in points, for the seasonal component
    /// * `window_size` - Points per sliding window
    ///
    /// # Errors
    ///
    /// - Validation: zero freq or window size
    /// - AgentNotFound: no agent with that id
    /// - Store: repository failure, propagated verbatim
    async fn trend(
        &self,
        agent_id: AgentId,
        freq: usize,
        window_size: usize,
    ) -> Result<TrendReport, TrustEngineError>;
}

/// Standard implementation of TrustAuditService
pub struct StandardTrustAuditService {
    agents: Arc<dyn AgentRepository>,
    trust_events: Arc<dyn TrustEventRepository>,
    event_bus: Arc<EventBus>,
    config: TrustConfig,
}

impl StandardTrustAuditService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        trust_events: Arc<dyn TrustEventRepository>,
        event_bus: Arc<EventBus>,
        config: TrustConfig,
    ) -> Self {
        Self {
            agents,
            trust_events,
            event_bus,
            config,
        }
    }
}

#[async_trait]
impl TrustAuditService for StandardTrustAuditService {
    async fn audit(&self, threshold: Option<f64>) -> Result<TrustAuditReport, TrustEngineError> {
        let threshold = threshold.unwrap_or(self.config.audit.threshold);
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(TrustEngineError::Validation(format!(
                "audit threshold {} outside [0, 100]",
                threshold
            )));
        }

        let now = Utc::now();
        let since = now - Duration::hours(self.config.audit.window_hours);
        let mut flagged_agents = Vec::new();

        for agent in self.agents.list_all().await? {
            let events = self
                .trust_events
                .list_recent_by_agent(agent.id, since)
                .await?;
            let occurrences = count_subthreshold_dips(agent.trust_score, &events, threshold);

            if occurrences > 2 {
                warn!(
                    agent_id = %agent.id,
                    occurrences,
                    score = agent.trust_score,
                    threshold,
                    "Agent flagged by trust audit"
                );
                counter!("trust_audit_flagged_total").increment(1);
                self.event_bus
                    .publish_scoring_event(ScoringEvent::AgentFlagged {
                        agent_id: agent.id,
                        occurrences,
                        current_score: agent.trust_score,
                        threshold,
                        flagged_at: now,
                    });
                flagged_agents.push(FlaggedAgent {
                    agent_id: agent.id,
                    agent_name: agent.name,
                    occurrences,
                    current_score: agent.trust_score,
                });
            }
        }

        Ok(TrustAuditReport {
            flagged_agents,
            threshold,
        })
    }

    async fn trend(
        &self,
        agent_id: AgentId,
        freq: usize,
        window_size: usize,
    ) -> Result<TrendReport, TrustEngineError> {
        if freq == 0 {
            return Err(TrustEngineError::Validation(
                "freq must be at least 1".to_string(),
            ));
        }
        if window_size == 0 {
            return Err(TrustEngineError::Validation(
                "window must be at least 1".to_string(),
            ));
        }

        let agent = self
            .agents
            .find_by_id(agent_id)
            .await?
            .ok_or(TrustEngineError::AgentNotFound(agent_id))?;

        let now = Utc::now();
        let since = now - Duration::days(self.config.metrics_window_days);
        let events = self
            .trust_events
            .list_recent_by_agent(agent_id, since)
            .await?;

        let series = reconstruct_trajectory(agent.trust_score, &events);
        let windows = sliding_window_decompose(&series, freq, window_size);

        Ok(TrendReport {
            agent_id,
            current_score: agent.trust_score,
            series_len: series.len(),
            windows,
        })
    }
}

/// Walk the ledger newest-first, rebuilding the score that existed after
/// each historical event (previous = running - delta), and count the events
/// that were both negative and left the score under threshold.
fn count_subthreshold_dips(current_score: f64, events: &[TrustEvent], threshold: f64) -> u32 {
    let mut running = current_score;
    let mut occurrences = 0u32;
    for event in events.iter().rev() {
        let score_after_event = running;
        if event.delta < 0.0 && score_after_event < threshold {
            occurrences += 1;
        }
        running = score_after_event - event.delta;
    }
    occurrences
}

/// Rebuild the forward score trajectory from the ledger: one point per
/// event, valued at the score that held after it.
fn reconstruct_trajectory(current_score: f64, events: &[TrustEvent]) -> Vec<TrustDataPoint> {
    let total: f64 = events.iter().map(|e| e.delta).sum();
    let mut running = current_score - total;
    let mut series = Vec::with_capacity(events.len());
    for event in events {
        running += event.delta;
        series.push(TrustDataPoint {
            timestamp: event.created_at,
            value: running,
        });
    }
    series
}

/// Naive additive decomposition over every sliding window of the series.
///
/// Per window: trend is a trailing moving average over up to `freq` points,
/// the seasonal component is the per-phase mean of the detrended values,
/// and the residual is what remains. Returns an empty result when the
/// parameters are degenerate or the series is shorter than the window.
pub fn sliding_window_decompose(
    history: &[TrustDataPoint],
    freq: usize,
    window_size: usize,
) -> Vec<WindowDecomposition> {
    if freq == 0 || window_size == 0 || history.len() < window_size {
        return Vec::new();
    }

    let mut sorted: Vec<&TrustDataPoint> = history.iter().collect();
    sorted.sort_by_key(|p| p.timestamp);

    let mut results = Vec::new();
    for start in 0..=sorted.len() - window_size {
        let window = &sorted[start..start + window_size];
        let values: Vec<f64> = window.iter().map(|p| p.value).collect();

        let mut trend = Vec::with_capacity(values.len());
        for i in 0..values.len() {
            let begin = (i + 1).saturating_sub(freq);
            let slice = &values[begin..=i];
            trend.push(slice.iter().sum::<f64>() / slice.len() as f64);
        }

        let mut seasonal = vec![0.0; values.len()];
        for phase in 0..freq.min(values.len()) {
            let diffs: Vec<f64> = (phase..values.len())
                .step_by(freq)
                .map(|j| values[j] - trend[j])
                .collect();
            if diffs.is_empty() {
                continue;
            }
            let avg = diffs.iter().sum::<f64>() / diffs.len() as f64;
            for j in (phase..values.len()).step_by(freq) {
                seasonal[j] = avg;
            }
        }

        let residual: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, v)| v - trend[i] - seasonal[i])
            .collect();

        results.push(WindowDecomposition {
            window_start: window[0].timestamp,
            window_end: window[window.len() - 1].timestamp,
            trend,
            seasonal,
            residual,
        });
    }
    results
}
