// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Trust Recalculation Use Case
//!
//! Application service that turns an agent's recent history into a fresh
//! trust score and persists the transition.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Orchestrate aggregate → trigger → compose → record
//! - **Collaborators:**
//!   - Domain: Agent aggregate, TrustEvent ledger
//!   - Application: MetricAggregator, TriggerEvaluator, ScoreCompositor
//!   - Infrastructure: AgentRepository, TaskRepository, TrustEventRepository,
//!     AuditLogRepository, KeyedLockRegistry, EventBus

use async_trait::async_trait;
use chrono::{Duration, Utc};
use metrics::{counter, histogram};
use std::sync::Arc;
use tracing::info;

use crate::application::metrics::MetricAggregator;
use crate::application::score::ScoreCompositor;
use crate::application::triggers::TriggerEvaluator;
use crate::domain::agent::{clamp_trust_score, AgentId};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::config::TrustConfig;
use crate::domain::error::TrustEngineError;
use crate::domain::events::ScoringEvent;
use crate::domain::repository::{
    AgentRepository, AuditLogRepository, TaskRepository, TrustEventRepository,
};
use crate::domain::trust::{TriggerAdjustments, TrustEvent, TrustEventType, TrustMetrics};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::keyed_lock::KeyedLockRegistry;

/// Result of one trust recomputation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RecalculationOutcome {
    pub agent_id: AgentId,
    pub trust_score: f64,
    pub previous_score: f64,
    pub delta: f64,
    pub metrics: TrustMetrics,
    pub adjustments: TriggerAdjustments,
    pub reason: String,
}

/// Manual score adjustment request.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TrustDeltaRequest {
    /// Signed adjustment to apply before clamping
    pub delta: f64,

    /// Optional: event type to record; derived from the applied delta when
    /// absent
    #[serde(default)]
    pub event_type: Option<TrustEventType>,

    /// Optional: human-readable justification
    #[serde(default)]
    pub reason: Option<String>,
}

/// Result of a manual score adjustment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrustDeltaOutcome {
    pub agent_id: AgentId,
    pub trust_score: f64,
    /// Delta the caller asked for
    pub requested_delta: f64,
    /// Delta actually recorded after clamping at the score bounds
    pub applied_delta: f64,
}

/// Trust Scoring Use Case
#[async_trait]
pub trait TrustScoringService: Send + Sync {
    /// Recompute one agent's trust score from its recent history.
    ///
    /// # Arguments
    ///
    /// * `agent_id` - Agent whose score to recompute
    ///
    /// # Returns
    ///
    /// The new score with the metrics, adjustments, and reason behind it
    ///
    /// # Errors
    ///
    /// - AgentNotFound: no agent with that id
    /// - Store: repository failure, propagated verbatim
    async fn recalculate(&self, agent_id: AgentId) -> Result<RecalculationOutcome, TrustEngineError>;

    /// Apply a manual trust delta to one agent.
    ///
    /// The recorded event carries the delta that survived clamping, so the
    /// ledger replays to the stored score exactly.
    ///
    /// # Errors
    ///
    /// - Validation: non-finite delta
    /// - AgentNotFound: no agent with that id
    /// - Store: repository failure, propagated verbatim
    async fn apply_delta(
        &self,
        agent_id: AgentId,
        request: TrustDeltaRequest,
    ) -> Result<TrustDeltaOutcome, TrustEngineError>;
}

/// Standard implementation of TrustScoringService
pub struct StandardTrustScoringService {
    agents: Arc<dyn AgentRepository>,
    tasks: Arc<dyn TaskRepository>,
    trust_events: Arc<dyn TrustEventRepository>,
    audit_log: Arc<dyn AuditLogRepository>,
    agent_locks: Arc<KeyedLockRegistry>,
    event_bus: Arc<EventBus>,
    config: TrustConfig,
    aggregator: MetricAggregator,
    evaluator: TriggerEvaluator,
    compositor: ScoreCompositor,
}

impl StandardTrustScoringService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        tasks: Arc<dyn TaskRepository>,
        trust_events: Arc<dyn TrustEventRepository>,
        audit_log: Arc<dyn AuditLogRepository>,
        agent_locks: Arc<KeyedLockRegistry>,
        event_bus: Arc<EventBus>,
        config: TrustConfig,
    ) -> Self {
        let aggregator = MetricAggregator::new(&config);
        let evaluator = TriggerEvaluator::new(&config.triggers);
        let compositor = ScoreCompositor::new(&config);
        Self {
            agents,
            tasks,
            trust_events,
            audit_log,
            agent_locks,
            event_bus,
            config,
            aggregator,
            evaluator,
            compositor,
        }
    }
}

#[async_trait]
impl TrustScoringService for StandardTrustScoringService {
    async fn recalculate(&self, agent_id: AgentId) -> Result<RecalculationOutcome, TrustEngineError> {
        // Per-agent mutual exclusion: two concurrent recomputations must
        // not both read the same previous score.
        let _guard = self.agent_locks.lock(agent_id.0).await;
        let started = std::time::Instant::now();

        // Step 1: Load the agent
        let agent = self
            .agents
            .find_by_id(agent_id)
            .await?
            .ok_or(TrustEngineError::AgentNotFound(agent_id))?;

        // Step 2: Fetch the rolling history window
        let now = Utc::now();
        let since = now - Duration::days(self.config.metrics_window_days);
        let tasks = self.tasks.list_recent_by_agent(agent_id, since).await?;
        let events = self.trust_events.list_recent_by_agent(agent_id, since).await?;

        // Step 3: Aggregate, evaluate triggers, compose
        let metrics = self.aggregator.compute(&tasks, &events, now);
        let adjustments = self.evaluator.evaluate(&tasks, now);
        let new_score = self.compositor.compose(&metrics, &adjustments);

        let previous_score = agent.trust_score;
        let delta = new_score - previous_score;
        let reason = build_reason(&metrics, &adjustments);

        // Step 4: Persist score and transition record in one atomic store op
        let event = TrustEvent::new(
            agent_id,
            delta,
            TrustEventType::from_delta(delta),
            reason.clone(),
            serde_json::json!({
                "metrics": metrics,
                "adjustments": adjustments,
            }),
            now,
        );
        self.agents
            .update_score_with_event(agent_id, new_score, &event)
            .await?;

        // Step 5: Publish domain event
        self.event_bus
            .publish_scoring_event(ScoringEvent::TrustRecalculated {
                agent_id,
                previous_score,
                new_score,
                delta,
                reason: reason.clone(),
                recalculated_at: now,
            });

        counter!("trust_recalculations_total").increment(1);
        histogram!("trust_recalculation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            agent_id = %agent_id,
            previous = previous_score,
            new = new_score,
            delta,
            "Trust score recalculated"
        );

        Ok(RecalculationOutcome {
            agent_id,
            trust_score: new_score,
            previous_score,
            delta,
            metrics,
            adjustments,
            reason,
        })
    }

    async fn apply_delta(
        &self,
        agent_id: AgentId,
        request: TrustDeltaRequest,
    ) -> Result<TrustDeltaOutcome, TrustEngineError> {
        if !request.delta.is_finite() {
            return Err(TrustEngineError::Validation(
                "delta must be a finite number".to_string(),
            ));
        }

        let _guard = self.agent_locks.lock(agent_id.0).await;

        let agent = self
            .agents
            .find_by_id(agent_id)
            .await?
            .ok_or(TrustEngineError::AgentNotFound(agent_id))?;

        let now = Utc::now();
        let previous_score = agent.trust_score;
        let new_score = clamp_trust_score(previous_score + request.delta);
        // The ledger records what actually happened to the score, which at
        // the bounds is less than what was requested.
        let applied_delta = new_score - previous_score;

        let reason = request
            .reason
            .unwrap_or_else(|| "manual trust adjustment".to_string());
        let event_type = request
            .event_type
            .unwrap_or_else(|| TrustEventType::from_delta(applied_delta));

        let event = TrustEvent::new(
            agent_id,
            applied_delta,
            event_type,
            reason.clone(),
            serde_json::json!({ "requested_delta": request.delta }),
            now,
        );
        self.agents
            .update_score_with_event(agent_id, new_score, &event)
            .await?;

        self.audit_log
            .insert(&AuditRecord::new(
                Some(agent_id),
                None,
                AuditAction::PolicyReeval,
                "trust_update",
                serde_json::json!({
                    "requested_delta": request.delta,
                    "applied_delta": applied_delta,
                    "reason": reason,
                }),
                now,
            ))
            .await?;

        self.event_bus
            .publish_scoring_event(ScoringEvent::TrustDeltaApplied {
                agent_id,
                requested_delta: request.delta,
                applied_delta,
                new_score,
                applied_at: now,
            });

        info!(
            agent_id = %agent_id,
            requested = request.delta,
            applied = applied_delta,
            new = new_score,
            "Manual trust delta applied"
        );

        Ok(TrustDeltaOutcome {
            agent_id,
            trust_score: new_score,
            requested_delta: request.delta,
            applied_delta,
        })
    }
}

/// Build the human-readable reason recorded with a recomputation event.
///
/// Notes are concatenated in fixed priority order; when nothing noteworthy
/// happened the reason falls back to "routine recalculation".
pub fn build_reason(metrics: &TrustMetrics, adjustments: &TriggerAdjustments) -> String {
    let mut notes: Vec<String> = Vec::new();

    if adjustments.delayed_penalty != 0.0 {
        notes.push(format!(
            "delayed tasks penalty applied ({:.0})",
            adjustments.delayed_penalty
        ));
    }
    if adjustments.sla_bonus != 0.0 {
        notes.push(format!(
            "sla compliance bonus applied (+{:.0})",
            adjustments.sla_bonus
        ));
    }
    if metrics.performance_drift > 20.0 {
        notes.push(format!(
            "performance drift at {:.1}",
            metrics.performance_drift
        ));
    }
    if metrics.anomaly_score > 30.0 {
        notes.push(format!(
            "anomalous delta pattern at {:.1}%",
            metrics.anomaly_score
        ));
    }
    if metrics.trust_volatility > 10.0 {
        notes.push(format!(
            "trust volatility at {:.1}",
            metrics.trust_volatility
        ));
    }
    if metrics.weighted_failure_rate > 20.0 {
        notes.push(format!(
            "weighted failure rate at {:.1}%",
            metrics.weighted_failure_rate
        ));
    }

    if notes.is_empty() {
        "routine recalculation".to_string()
    } else {
        notes.join("; ")
    }
}
