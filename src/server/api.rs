use std::sync::Arc;

use aurora_common::{BurnSummary, PersonaInstance, StateMap};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::services::AuroraRuntime;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub runtime: AuroraRuntime,
}

pub type SharedState = Arc<AppState>;

// ── Request / response payloads ───────────────────────────────────────

#[derive(Deserialize)]
pub struct ChatRequest {
    pub instance_id: String,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub directive: String,
}

#[derive(Serialize, Deserialize)]
pub struct StateUpdateResponse {
    pub applied: Vec<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            err if err.is_not_found() => ApiError::NotFound(err.to_string()),
            ServiceError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            other => {
                tracing::error!("Request failed: {:#}", other);
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route(
            "/api/v1/personas/{persona_id}/rehydrate",
            post(rehydrate_persona),
        )
        .route("/api/v1/personas/instances", get(list_instances))
        .route(
            "/api/v1/personas/instances/{instance_id}",
            get(get_instance),
        )
        .route(
            "/api/v1/personas/instances/{instance_id}/state",
            patch(update_state),
        )
        .route("/api/v1/orchestrator/chat", post(chat))
        .route("/api/v1/orchestrator/generate", post(generate_persona))
        .route("/api/v1/are/run_burn/{instance_id}", post(run_burn))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "Aurora Genesis Engine is online and operational."
    }))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn rehydrate_persona(
    State(state): State<SharedState>,
    Path(persona_id): Path<String>,
) -> Result<Json<PersonaInstance>, ApiError> {
    let instance = state.runtime.personas.rehydrate(&persona_id).await?;
    Ok(Json(instance))
}

async fn list_instances(State(state): State<SharedState>) -> Json<Vec<PersonaInstance>> {
    Json(state.runtime.registry.list().await)
}

async fn get_instance(
    State(state): State<SharedState>,
    Path(instance_id): Path<String>,
) -> Result<Json<PersonaInstance>, ApiError> {
    state
        .runtime
        .registry
        .snapshot(&instance_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ServiceError::InstanceNotFound {
                id: instance_id.clone(),
            }
            .into()
        })
}

async fn update_state(
    State(state): State<SharedState>,
    Path(instance_id): Path<String>,
    Json(updates): Json<StateMap>,
) -> Result<Json<StateUpdateResponse>, ApiError> {
    let applied = state
        .runtime
        .turns
        .update_state(&instance_id, &updates)
        .await?;
    Ok(Json(StateUpdateResponse { applied }))
}

async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .runtime
        .turns
        .process_turn(&req.instance_id, &req.message)
        .await?;
    Ok(Json(ChatResponse { response }))
}

async fn generate_persona(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let instance = state.runtime.genesis.generate_persona(&req.directive).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

async fn run_burn(
    State(state): State<SharedState>,
    Path(instance_id): Path<String>,
) -> Result<Json<BurnSummary>, ApiError> {
    let summary = state.runtime.burns.run_controlled_burn(&instance_id).await?;
    Ok(Json(summary))
}
