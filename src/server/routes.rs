//! HTTP handlers for routing previews, query turns and turn lookups

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ServerAppState;
use crate::errors::CoordinatorError;
use crate::models::{
    AgentDescriptor, AgentInteraction, CoordinationMode, QueryContext, RoutingDecision,
    SynthesizedResponse, TurnOutcome,
};

/// Body of `/api/route` and `/api/query`: the query context plus an optional mode
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(flatten)]
    pub context: QueryContext,
    #[serde(default)]
    pub mode: Option<CoordinationMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentsResponse {
    pub agents: Vec<AgentDescriptor>,
    pub default_mode: CoordinationMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRecordsResponse {
    pub turn_id: String,
    pub interactions: Vec<AgentInteraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<SynthesizedResponse>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler error rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        log::error!("Request failed: {}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

pub async fn health_handler() -> &'static str {
    "OK"
}

#[derive(Serialize)]
pub struct VersionInfo {
    version: String,
}

pub async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Registered agents in declaration order
pub async fn agents_handler(State(state): State<ServerAppState>) -> Json<AgentsResponse> {
    Json(AgentsResponse {
        agents: state.coordinator.router().registry().agents().to_vec(),
        default_mode: state.coordinator.config().default_mode,
    })
}

/// Routing decision for a query, no agent is invoked
pub async fn route_handler(
    State(state): State<ServerAppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RoutingDecision>, ApiError> {
    let decision = state.coordinator.preview(&request.context, request.mode)?;
    Ok(Json(decision))
}

/// Run one full turn. A turn in which every agent failed is still a 200.
pub async fn query_handler(
    State(state): State<ServerAppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    if state.shutdown_state.is_shutdown_requested() {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server is shutting down",
        ));
    }
    let outcome = state
        .coordinator
        .handle(request.context, request.mode)
        .await?;
    Ok(Json(outcome))
}

/// Persisted interactions and response of a past turn
pub async fn turn_handler(
    State(state): State<ServerAppState>,
    Path(turn_id): Path<String>,
) -> Result<Json<TurnRecordsResponse>, ApiError> {
    let store = state.coordinator.store();
    let read_error = |e: anyhow::Error| {
        log::error!("Failed to read records of turn {}: {}", turn_id, e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    };

    // Store reads may block on file I/O
    let lookup_id = turn_id.clone();
    let (interactions, response) = tokio::task::spawn_blocking(move || {
        anyhow::Ok((
            store.interactions_for(&lookup_id)?,
            store.response_for(&lookup_id)?,
        ))
    })
    .await
    .map_err(|e| read_error(anyhow::anyhow!("record lookup task failed: {}", e)))?
    .map_err(read_error)?;
    if interactions.is_empty() && response.is_none() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Unknown turn: {}", turn_id),
        ));
    }

    Ok(Json(TurnRecordsResponse {
        turn_id: turn_id.clone(),
        interactions,
        response,
    }))
}
