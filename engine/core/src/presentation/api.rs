use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive},
    response::{IntoResponse, Response, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::application::{
    AssignTaskRequest, AssignedTask, ReassignmentOutcome, ReassignmentService,
    RecalculationOutcome, TaskAssignmentService, TrendReport, TrustAuditReport,
    TrustAuditService, TrustDeltaOutcome, TrustDeltaRequest, TrustScoringService,
};
use crate::domain::agent::{Agent, AgentId, Protocol, INITIAL_TRUST_SCORE};
use crate::domain::error::TrustEngineError;
use crate::domain::repository::AgentRepository;
use crate::domain::task::TaskId;
use crate::domain::trust::TrustEventType;
use crate::infrastructure::event_bus::EventBus;

/// Shared handler state. Built once in the serve path and cloned into the
/// router; everything behind it is `Send + Sync`.
pub struct AppState {
    pub scoring: Arc<dyn TrustScoringService>,
    pub reassignment: Arc<dyn ReassignmentService>,
    pub assignment: Arc<dyn TaskAssignmentService>,
    pub audit: Arc<dyn TrustAuditService>,
    pub agents: Arc<dyn AgentRepository>,
    pub event_bus: Arc<EventBus>,
    pub started_at: Instant,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agents", post(register_agent).get(list_agents))
        .route("/api/agents/{agent_id}", get(get_agent))
        .route("/api/tasks/assign", post(assign_task))
        .route("/api/tasks/{task_id}/reassign", post(reassign_task))
        .route("/api/trust/recalculate", post(recalculate_trust))
        .route("/api/trust/delta", post(apply_trust_delta))
        .route("/api/trust/audit", post(run_trust_audit))
        .route("/api/trust/{agent_id}/trend", get(trust_trend))
        .route("/api/events", get(stream_events))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Engine error mapped onto an HTTP status with a `{"error": ...}` body.
pub struct ApiError(TrustEngineError);

impl From<TrustEngineError> for ApiError {
    fn from(err: TrustEngineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TrustEngineError::Validation(_) => StatusCode::BAD_REQUEST,
            TrustEngineError::AgentNotFound(_) | TrustEngineError::TaskNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TrustEngineError::NoAgentsAvailable(_) => StatusCode::CONFLICT,
            TrustEngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn parse_agent_id(raw: &str) -> Result<AgentId, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map(AgentId)
        .map_err(|_| ApiError(TrustEngineError::Validation(format!("invalid agent id: {raw}"))))
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    uuid::Uuid::parse_str(raw)
        .map(TaskId)
        .map_err(|_| ApiError(TrustEngineError::Validation(format!("invalid task id: {raw}"))))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "arbiter-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "subscribers": state.event_bus.subscriber_count(),
    }))
}

#[derive(serde::Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub trust_score: Option<f64>,
}

async fn register_agent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterAgentRequest>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = Agent::new(
        payload.name,
        payload.protocol,
        payload.trust_score.unwrap_or(INITIAL_TRUST_SCORE),
    );
    agent.validate().map_err(TrustEngineError::from)?;
    state
        .agents
        .save(&agent)
        .await
        .map_err(TrustEngineError::from)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Agent>>, ApiError> {
    let agents = state
        .agents
        .list_all()
        .await
        .map_err(TrustEngineError::from)?;
    Ok(Json(agents))
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let agent_id = parse_agent_id(&agent_id)?;
    let agent = state
        .agents
        .find_by_id(agent_id)
        .await
        .map_err(TrustEngineError::from)?
        .ok_or(TrustEngineError::AgentNotFound(agent_id))?;
    Ok(Json(agent))
}

async fn assign_task(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<Json<AssignedTask>, ApiError> {
    let assigned = state.assignment.assign(payload).await?;
    Ok(Json(assigned))
}

async fn reassign_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<ReassignmentOutcome>, ApiError> {
    let task_id = parse_task_id(&task_id)?;
    let outcome = state.reassignment.evaluate(task_id).await?;
    Ok(Json(outcome))
}

#[derive(serde::Deserialize)]
pub struct RecalculateRequest {
    pub agent_id: String,
}

async fn recalculate_trust(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecalculateRequest>,
) -> Result<Json<RecalculationOutcome>, ApiError> {
    let agent_id = parse_agent_id(&payload.agent_id)?;
    let outcome = state.scoring.recalculate(agent_id).await?;
    Ok(Json(outcome))
}

#[derive(serde::Deserialize)]
pub struct ApplyDeltaRequest {
    pub agent_id: String,
    pub delta: f64,
    #[serde(default)]
    pub event_type: Option<TrustEventType>,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn apply_trust_delta(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ApplyDeltaRequest>,
) -> Result<Json<TrustDeltaOutcome>, ApiError> {
    let agent_id = parse_agent_id(&payload.agent_id)?;
    let request = TrustDeltaRequest {
        delta: payload.delta,
        event_type: payload.event_type,
        reason: payload.reason,
    };
    let outcome = state.scoring.apply_delta(agent_id, request).await?;
    Ok(Json(outcome))
}

#[derive(serde::Deserialize, Default)]
pub struct AuditRequest {
    #[serde(default)]
    pub threshold: Option<f64>,
}

async fn run_trust_audit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AuditRequest>,
) -> Result<Json<TrustAuditReport>, ApiError> {
    let report = state.audit.audit(payload.threshold).await?;
    Ok(Json(report))
}

#[derive(serde::Deserialize)]
pub struct TrendParams {
    #[serde(default)]
    pub freq: Option<usize>,
    #[serde(default)]
    pub window: Option<usize>,
}

async fn trust_trend(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Query(params): Query<TrendParams>,
) -> Result<Json<TrendReport>, ApiError> {
    let agent_id = parse_agent_id(&agent_id)?;
    let freq = params.freq.unwrap_or(7);
    let window = params.window.unwrap_or(14);
    let report = state.audit.trend(agent_id, freq, window).await?;
    Ok(Json(report))
}

#[derive(serde::Deserialize)]
pub struct EventStreamParams {
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Live engine events over SSE. `?agent_id=` narrows the stream to events
/// concerning one agent; lagged receivers silently skip dropped events.
async fn stream_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventStreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let filter = match params.agent_id.as_deref() {
        Some(raw) => Some(parse_agent_id(raw)?),
        None => None,
    };

    let stream = BroadcastStream::new(state.event_bus.subscribe_raw()).filter_map(move |item| {
        let event = match item {
            Ok(event) => event,
            Err(_) => return None,
        };
        if let Some(wanted) = filter {
            if event.agent_id() != Some(wanted) {
                return None;
            }
        }
        match serde_json::to_string(&event) {
            Ok(payload) => Some(Ok::<_, axum::Error>(Event::default().data(payload))),
            Err(_) => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
