// Copyright (c) 2026 Arbiter Labs
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the HTTP surface
//!
//! These tests exercise the full router over the in-memory store:
//! 1. Request deserialization and id parsing
//! 2. Service dispatch through the shared AppState
//! 3. Error mapping onto HTTP status codes

use arbiter_core::application::{
    StandardReassignmentService, StandardTaskAssignmentService, StandardTrustAuditService,
    StandardTrustScoringService,
};
use arbiter_core::domain::agent::{Agent, Protocol};
use arbiter_core::domain::config::TrustConfig;
use arbiter_core::domain::repository::AgentRepository;
use arbiter_core::infrastructure::event_bus::EventBus;
use arbiter_core::infrastructure::keyed_lock::KeyedLockRegistry;
use arbiter_core::infrastructure::repositories::InMemoryTrustStore;
use arbiter_core::presentation::api::{app, AppState};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use uuid::Uuid;

fn test_app() -> (InMemoryTrustStore, Router) {
    let store = InMemoryTrustStore::new();
    let bus = Arc::new(EventBus::with_default_capacity());
    let config = TrustConfig::default();

    let scoring = StandardTrustScoringService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(KeyedLockRegistry::new()),
        Arc::clone(&bus),
        config.clone(),
    );
    let reassignment = StandardReassignmentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(KeyedLockRegistry::new()),
        Arc::clone(&bus),
        config.reassignment.clone(),
    );
    let assignment = StandardTaskAssignmentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(&bus),
    );
    let audit = StandardTrustAuditService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::clone(&bus),
        config,
    );

    let state = AppState {
        scoring: Arc::new(scoring),
        reassignment: Arc::new(reassignment),
        assignment: Arc::new(assignment),
        audit: Arc::new(audit),
        agents: Arc::new(store.clone()),
        event_bus: bus,
        started_at: Instant::now(),
    };
    (store, app(Arc::new(state)))
}

async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_ok() {
    let (_store, router) = test_app();

    let (status, body) = send_json(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "arbiter-engine");
}

#[tokio::test]
async fn test_register_and_list_agents() {
    let (_store, router) = test_app();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/agents",
        Some(json!({ "name": "translator", "protocol": "mcp" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "translator");
    assert_eq!(body["protocol"], "mcp");
    assert_eq!(body["trust_score"], 50.0);
    assert_eq!(body["is_active"], true);
    assert!(Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());

    let (status, body) = send_json(&router, "GET", "/api/agents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_agent_rejects_blank_name() {
    let (_store, router) = test_app();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/agents",
        Some(json!({ "name": "   ", "protocol": "mcp" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_register_agent_rejects_unknown_protocol() {
    let (_store, router) = test_app();

    let (status, _body) = send_json(
        &router,
        "POST",
        "/api/agents",
        Some(json!({ "name": "translator", "protocol": "grpc" })),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_recalculate_returns_outcome() {
    let (store, router) = test_app();

    let agent = Agent::new("translator", Protocol::Mcp, 50.0);
    AgentRepository::save(&store, &agent).await.unwrap();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/trust/recalculate",
        Some(json!({ "agent_id": agent.id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trust_score"], 87.5);
    assert_eq!(body["previous_score"], 50.0);
    assert_eq!(body["reason"], "routine recalculation");
    assert_eq!(body["metrics"]["completion_rate"], 50.0);
}

#[tokio::test]
async fn test_recalculate_rejects_malformed_agent_id() {
    let (_store, router) = test_app();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/trust/recalculate",
        Some(json!({ "agent_id": "not-a-uuid" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid agent id"));
}

#[tokio::test]
async fn test_recalculate_unknown_agent_is_404() {
    let (_store, router) = test_app();

    let (status, _body) = send_json(
        &router,
        "POST",
        "/api/trust/recalculate",
        Some(json!({ "agent_id": Uuid::new_v4().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_apply_delta_endpoint() {
    let (store, router) = test_app();

    let agent = Agent::new("translator", Protocol::Mcp, 50.0);
    AgentRepository::save(&store, &agent).await.unwrap();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/trust/delta",
        Some(json!({
            "agent_id": agent.id.to_string(),
            "delta": -5.0,
            "reason": "manual review"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requested_delta"], -5.0);
    assert_eq!(body["applied_delta"], -5.0);
    assert_eq!(body["trust_score"], 45.0);
}

#[tokio::test]
async fn test_audit_with_no_history_reports_nothing() {
    let (_store, router) = test_app();

    let (status, body) = send_json(&router, "POST", "/api/trust/audit", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"], 70.0);
    assert_eq!(body["flagged_agents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_assign_without_agents_is_conflict() {
    let (_store, router) = test_app();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/tasks/assign",
        Some(json!({ "protocol": "mcp", "task_type": "translate" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("no active agents"));
}

#[tokio::test]
async fn test_assign_picks_highest_trust_agent() {
    let (store, router) = test_app();

    let alpha = Agent::new("alpha", Protocol::Mcp, 90.0);
    let beta = Agent::new("beta", Protocol::Mcp, 70.0);
    AgentRepository::save(&store, &alpha).await.unwrap();
    AgentRepository::save(&store, &beta).await.unwrap();

    let (status, body) = send_json(
        &router,
        "POST",
        "/api/tasks/assign",
        Some(json!({
            "protocol": "mcp",
            "task_type": "translate",
            "payload": { "text": "hello" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["id"], json!(alpha.id.to_string()));
    assert_eq!(body["status"], "assigned");
    assert!(Uuid::parse_str(body["task_id"].as_str().unwrap()).is_ok());

    let records = store.audit_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource, "task_assignment");
}

#[tokio::test]
async fn test_reassign_unknown_task_is_404() {
    let (_store, router) = test_app();

    let uri = format!("/api/tasks/{}/reassign", Uuid::new_v4());
    let (status, _body) = send_json(&router, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trend_endpoint_with_no_history() {
    let (store, router) = test_app();

    let agent = Agent::new("translator", Protocol::Mcp, 50.0);
    AgentRepository::save(&store, &agent).await.unwrap();

    let uri = format!("/api/trust/{}/trend?freq=2&window=3", agent.id);
    let (status, body) = send_json(&router, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["series_len"], 0);
    assert_eq!(body["windows"].as_array().unwrap().len(), 0);
}
