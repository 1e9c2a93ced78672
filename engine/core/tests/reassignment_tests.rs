// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the reassignment circuit breaker
//!
//! These tests verify the full evaluation path:
//! 1. Completed tasks short-circuit untouched
//! 2. Latency and trust-drop conditions trip the breaker
//! 3. The next lower-ranked agent in the protocol pool takes over
//! 4. Task mutation and audit record land atomically

use arbiter_core::application::{
    ReassignmentOutcome, ReassignmentService, StandardReassignmentService,
};
use arbiter_core::domain::agent::{Agent, AgentId, Protocol};
use arbiter_core::domain::audit::AuditAction;
use arbiter_core::domain::config::ReassignmentConfig;
use arbiter_core::domain::error::TrustEngineError;
use arbiter_core::domain::events::RoutingEvent;
use arbiter_core::domain::repository::{AgentRepository, TaskRepository, TrustEventRepository};
use arbiter_core::domain::task::{Task, TaskId, TaskStatus};
use arbiter_core::domain::trust::{TrustEvent, TrustEventType};
use arbiter_core::infrastructure::event_bus::{DomainEvent, EventBus};
use arbiter_core::infrastructure::keyed_lock::KeyedLockRegistry;
use arbiter_core::infrastructure::repositories::InMemoryTrustStore;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;

fn reassignment_service(
    store: &InMemoryTrustStore,
    bus: &Arc<EventBus>,
) -> StandardReassignmentService {
    StandardReassignmentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(KeyedLockRegistry::new()),
        Arc::clone(bus),
        ReassignmentConfig::default(),
    )
}

async fn seed_agent(store: &InMemoryTrustStore, name: &str, score: f64) -> Agent {
    let agent = Agent::new(name, Protocol::Mcp, score);
    AgentRepository::save(store, &agent)
        .await
        .expect("failed to save agent");
    agent
}

async fn seed_task(
    store: &InMemoryTrustStore,
    agent_id: AgentId,
    status: TaskStatus,
    assigned_at: Option<DateTime<Utc>>,
) -> Task {
    let now = Utc::now();
    let task = Task {
        id: TaskId::new(),
        agent_id,
        protocol: Protocol::Mcp,
        task_type: "translate".to_string(),
        payload: json!({}),
        status,
        created_at: assigned_at.unwrap_or(now),
        assigned_at,
        completed_at: None,
    };
    TaskRepository::save(store, &task)
        .await
        .expect("failed to save task");
    task
}

#[tokio::test]
async fn test_completed_task_short_circuits() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let agent = seed_agent(&store, "alpha", 90.0).await;
    let task = seed_task(
        &store,
        agent.id,
        TaskStatus::Completed,
        Some(Utc::now() - Duration::hours(1)),
    )
    .await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    assert!(matches!(outcome, ReassignmentOutcome::Completed));

    let stored = TaskRepository::find_by_id(&store, task.id)
        .await
        .unwrap()
        .expect("task missing");
    assert_eq!(stored.agent_id, agent.id);
    assert!(store.audit_records().is_empty());
}

#[tokio::test]
async fn test_healthy_task_is_left_alone() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let agent = seed_agent(&store, "alpha", 90.0).await;
    let task = seed_task(
        &store,
        agent.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(2)),
    )
    .await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    assert!(matches!(outcome, ReassignmentOutcome::NoReassignment));
    assert!(store.audit_records().is_empty());
}

#[tokio::test]
async fn test_trust_drop_overrides_fresh_assignment() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);
    let now = Utc::now();

    let _alpha = seed_agent(&store, "alpha", 90.0).await;
    let beta = seed_agent(&store, "beta", 80.0).await;
    let gamma = seed_agent(&store, "gamma", 70.0).await;

    // Assigned two seconds ago, well under the latency threshold.
    let task = seed_task(
        &store,
        beta.id,
        TaskStatus::Assigned,
        Some(now - Duration::seconds(2)),
    )
    .await;

    // Deltas since assignment sum to -20, past the -15 drop threshold.
    for delta in [-12.0, -8.0] {
        let event = TrustEvent::new(
            beta.id,
            delta,
            TrustEventType::Error,
            "validator rejection",
            json!({}),
            now - Duration::seconds(1),
        );
        TrustEventRepository::insert(&store, &event)
            .await
            .expect("failed to insert event");
    }

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    match outcome {
        ReassignmentOutcome::Reassigned { new_agent, reason } => {
            assert_eq!(new_agent.id, gamma.id);
            assert_eq!(reason, "trust_drop");
        }
        other => panic!("expected reassignment, got {other:?}"),
    }

    // Task handed to the next-ranked agent with a fresh assignment clock.
    let stored = TaskRepository::find_by_id(&store, task.id)
        .await
        .unwrap()
        .expect("task missing");
    assert_eq!(stored.agent_id, gamma.id);
    assert_eq!(stored.status, TaskStatus::Assigned);
    assert!(stored.assigned_at.unwrap() > task.assigned_at.unwrap());

    let records = store.audit_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::Delegate);
    assert_eq!(records[0].resource, "task_reassignment");
    assert_eq!(records[0].agent_id, Some(gamma.id));
    assert_eq!(records[0].task_id, Some(task.id));
    assert_eq!(records[0].payload["from_agent"], json!(beta.id.to_string()));
    assert_eq!(records[0].payload["to_agent"], json!(gamma.id.to_string()));
    assert_eq!(records[0].payload["reason"], json!("trust_drop"));
}

#[tokio::test]
async fn test_latency_exceeded_hands_to_next_ranked_agent() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let _alpha = seed_agent(&store, "alpha", 90.0).await;
    let beta = seed_agent(&store, "beta", 80.0).await;
    let gamma = seed_agent(&store, "gamma", 70.0).await;

    let task = seed_task(
        &store,
        beta.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(10)),
    )
    .await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    match outcome {
        ReassignmentOutcome::Reassigned { new_agent, reason } => {
            assert_eq!(new_agent.id, gamma.id);
            assert_eq!(reason, "latency_exceeded");
        }
        other => panic!("expected reassignment, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_assignment_timestamp_counts_as_over_latency() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let alpha = seed_agent(&store, "alpha", 90.0).await;
    let beta = seed_agent(&store, "beta", 80.0).await;

    let task = seed_task(&store, alpha.id, TaskStatus::Assigned, None).await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    match outcome {
        ReassignmentOutcome::Reassigned { new_agent, reason } => {
            assert_eq!(new_agent.id, beta.id);
            assert_eq!(reason, "latency_exceeded");
        }
        other => panic!("expected reassignment, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lowest_ranked_agent_wraps_to_top() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let alpha = seed_agent(&store, "alpha", 90.0).await;
    let _beta = seed_agent(&store, "beta", 80.0).await;
    let gamma = seed_agent(&store, "gamma", 70.0).await;

    let task = seed_task(
        &store,
        gamma.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(10)),
    )
    .await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    match outcome {
        ReassignmentOutcome::Reassigned { new_agent, .. } => {
            assert_eq!(new_agent.id, alpha.id);
        }
        other => panic!("expected reassignment, got {other:?}"),
    }
}

#[tokio::test]
async fn test_single_agent_pool_reselects_same_agent() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let solo = seed_agent(&store, "solo", 60.0).await;
    let task = seed_task(
        &store,
        solo.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(10)),
    )
    .await;

    let outcome = service.evaluate(task.id).await.expect("evaluation failed");
    match outcome {
        ReassignmentOutcome::Reassigned { new_agent, .. } => {
            assert_eq!(new_agent.id, solo.id);
        }
        other => panic!("expected reassignment, got {other:?}"),
    }

    let stored = TaskRepository::find_by_id(&store, task.id)
        .await
        .unwrap()
        .expect("task missing");
    assert!(stored.assigned_at.unwrap() > task.assigned_at.unwrap());
}

#[tokio::test]
async fn test_empty_pool_is_an_error() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let mut retired = Agent::new("retired", Protocol::Mcp, 90.0);
    retired.is_active = false;
    AgentRepository::save(&store, &retired).await.unwrap();

    let task = seed_task(
        &store,
        retired.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(10)),
    )
    .await;

    let err = service
        .evaluate(task.id)
        .await
        .expect_err("empty pool must fail");
    assert!(matches!(err, TrustEngineError::NoAgentsAvailable(_)));
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let err = service
        .evaluate(TaskId::new())
        .await
        .expect_err("missing task must fail");
    assert!(matches!(err, TrustEngineError::TaskNotFound(_)));
}

#[tokio::test]
async fn test_reassignment_publishes_routing_event() {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let service = reassignment_service(&store, &bus);

    let alpha = seed_agent(&store, "alpha", 90.0).await;
    let beta = seed_agent(&store, "beta", 80.0).await;
    let task = seed_task(
        &store,
        alpha.id,
        TaskStatus::Assigned,
        Some(Utc::now() - Duration::seconds(10)),
    )
    .await;

    let mut receiver = bus.subscribe();
    service.evaluate(task.id).await.expect("evaluation failed");

    let event = receiver.try_recv().expect("no event published");
    match event {
        DomainEvent::Routing(RoutingEvent::TaskReassigned {
            task_id,
            from_agent,
            to_agent,
            reason,
            ..
        }) => {
            assert_eq!(task_id, task.id);
            assert_eq!(from_agent, alpha.id);
            assert_eq!(to_agent, beta.id);
            assert_eq!(reason, "latency_exceeded");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
