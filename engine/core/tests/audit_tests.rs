// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the trust audit walk and trend decomposition
//!
//! These tests verify:
//! 1. Historical score reconstruction from the event log
//! 2. The strict more-than-two dip rule for flagging
//! 3. Window scoping of the audit lookback
//! 4. Trajectory decomposition through the service surface

use arbiter_core::application::{StandardTrustAuditService, TrustAuditService};
use arbiter_core::domain::agent::{Agent, AgentId, Protocol};
use arbiter_core::domain::config::TrustConfig;
use arbiter_core::domain::error::TrustEngineError;
use arbiter_core::domain::events::ScoringEvent;
use arbiter_core::domain::repository::{AgentRepository, TrustEventRepository};
use arbiter_core::domain::trust::{TrustEvent, TrustEventType};
use arbiter_core::infrastructure::event_bus::{DomainEvent, EventBus};
use arbiter_core::infrastructure::repositories::InMemoryTrustStore;
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

fn audit_service(store: &InMemoryTrustStore, bus: &Arc<EventBus>) -> StandardTrustAuditService {
    StandardTrustAuditService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(bus),
        TrustConfig::default(),
    )
}

async fn seed_agent(store: &InMemoryTrustStore, name: &str, score: f64) -> Agent {
    let agent = Agent::new(name, Protocol::Mcp, score);
    AgentRepository::save(store, &agent)
        .await
        .expect("failed to save agent");
    agent
}

async fn insert_delta(store: &InMemoryTrustStore, agent: &Agent, delta: f64, hours_ago: i64) {
    let event = TrustEvent::new(
        agent.id,
        delta,
        TrustEventType::from_delta(delta),
        "synthetic",
        json!({}),
        Utc::now() - Duration::hours(hours_ago),
    );
    TrustEventRepository::insert(store, &event)
        .await
        .expect("failed to insert event");
}

#[tokio::test]
async fn test_three_subthreshold_dips_flag_the_agent() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    // Walking newest-first from 65: scores after each event are 65, 67, 69,
    // 71. The first three sit below 70 on a negative delta; the fourth does
    // not.
    let agent = seed_agent(&store, "wobbly", 65.0).await;
    for hours_ago in 1..=4 {
        insert_delta(&store, &agent, -2.0, hours_ago).await;
    }

    let report = service.audit(None).await.expect("audit failed");
    assert_eq!(report.threshold, 70.0);
    assert_eq!(report.flagged_agents.len(), 1);
    assert_eq!(report.flagged_agents[0].agent_id, agent.id);
    assert_eq!(report.flagged_agents[0].agent_name, "wobbly");
    assert_eq!(report.flagged_agents[0].occurrences, 3);
    assert_eq!(report.flagged_agents[0].current_score, 65.0);
}

#[tokio::test]
async fn test_two_dips_do_not_flag() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let agent = seed_agent(&store, "borderline", 65.0).await;
    for hours_ago in 1..=2 {
        insert_delta(&store, &agent, -2.0, hours_ago).await;
    }

    let report = service.audit(None).await.expect("audit failed");
    assert!(report.flagged_agents.is_empty());
}

#[tokio::test]
async fn test_events_outside_lookback_window_are_ignored() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    // Two dips inside the 24 h window, one stale dip outside it.
    let agent = seed_agent(&store, "recovering", 65.0).await;
    insert_delta(&store, &agent, -2.0, 1).await;
    insert_delta(&store, &agent, -2.0, 2).await;
    insert_delta(&store, &agent, -2.0, 30).await;

    let report = service.audit(None).await.expect("audit failed");
    assert!(report.flagged_agents.is_empty());
}

#[tokio::test]
async fn test_positive_deltas_never_count_as_dips() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    // Scores sit below threshold throughout, but every delta is a gain.
    let agent = seed_agent(&store, "climbing", 65.0).await;
    for hours_ago in 1..=4 {
        insert_delta(&store, &agent, 3.0, hours_ago).await;
    }

    let report = service.audit(None).await.expect("audit failed");
    assert!(report.flagged_agents.is_empty());
}

#[tokio::test]
async fn test_flagging_publishes_scoring_event() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let agent = seed_agent(&store, "wobbly", 65.0).await;
    for hours_ago in 1..=4 {
        insert_delta(&store, &agent, -2.0, hours_ago).await;
    }

    let mut receiver = bus.subscribe();
    service.audit(None).await.expect("audit failed");

    let event = receiver.try_recv().expect("no event published");
    match event {
        DomainEvent::Scoring(ScoringEvent::AgentFlagged {
            agent_id,
            occurrences,
            threshold,
            ..
        }) => {
            assert_eq!(agent_id, agent.id);
            assert_eq!(occurrences, 3);
            assert_eq!(threshold, 70.0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_threshold_override_is_validated() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let err = service
        .audit(Some(150.0))
        .await
        .expect_err("out-of-range threshold must fail");
    assert!(matches!(err, TrustEngineError::Validation(_)));

    let err = service
        .audit(Some(f64::NAN))
        .await
        .expect_err("NaN threshold must fail");
    assert!(matches!(err, TrustEngineError::Validation(_)));
}

#[tokio::test]
async fn test_trend_reconstructs_trajectory_and_decomposes() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    // Deltas +10, -5, +2 against a current score of 72 reconstruct the
    // trajectory 75, 70, 72.
    let agent = seed_agent(&store, "steady", 72.0).await;
    insert_delta(&store, &agent, 10.0, 72).await;
    insert_delta(&store, &agent, -5.0, 48).await;
    insert_delta(&store, &agent, 2.0, 24).await;

    let report = service
        .trend(agent.id, 2, 3)
        .await
        .expect("trend analysis failed");

    assert_eq!(report.agent_id, agent.id);
    assert_eq!(report.current_score, 72.0);
    assert_eq!(report.series_len, 3);
    assert_eq!(report.windows.len(), 1);

    let window = &report.windows[0];
    assert!(window.window_start < window.window_end);
    assert_eq!(window.trend.len(), 3);

    // The decomposition is additive per point: value = trend + seasonal +
    // residual.
    let values = [75.0, 70.0, 72.0];
    for i in 0..3 {
        let recomposed = window.trend[i] + window.seasonal[i] + window.residual[i];
        assert!(
            (recomposed - values[i]).abs() < 1e-9,
            "point {i}: {recomposed} != {}",
            values[i]
        );
    }
}

#[tokio::test]
async fn test_trend_with_no_history_yields_no_windows() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let agent = seed_agent(&store, "fresh", 50.0).await;
    let report = service
        .trend(agent.id, 7, 14)
        .await
        .expect("trend analysis failed");

    assert_eq!(report.series_len, 0);
    assert!(report.windows.is_empty());
}

#[tokio::test]
async fn test_trend_rejects_degenerate_parameters() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let agent = seed_agent(&store, "steady", 72.0).await;

    let err = service
        .trend(agent.id, 0, 3)
        .await
        .expect_err("zero freq must fail");
    assert!(matches!(err, TrustEngineError::Validation(_)));

    let err = service
        .trend(agent.id, 2, 0)
        .await
        .expect_err("zero window must fail");
    assert!(matches!(err, TrustEngineError::Validation(_)));
}

#[tokio::test]
async fn test_trend_unknown_agent_is_not_found() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = audit_service(&store, &bus);

    let err = service
        .trend(AgentId::new(), 2, 3)
        .await
        .expect_err("missing agent must fail");
    assert!(matches!(err, TrustEngineError::AgentNotFound(_)));
}
