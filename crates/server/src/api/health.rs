use std::sync::Arc;

use auris_core::AurisError;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gpu: bool,
    pub active_jobs: usize,
    pub model_cached: bool,
}

/// Re-runs the back-end's (idempotent) `load()` so a genuinely failed
/// load surfaces as 503 here instead of only at first job pickup.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Back-end is loaded and ready", body = HealthResponse),
        (status = 503, description = "Back-end failed to load")
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    state.backend.load().await.map_err(AurisError::from)?;
    let active_jobs = state.store.list_active().await.map_err(AurisError::from)?.len();
    Ok(Json(HealthResponse {
        status: "ok",
        gpu: std::env::var("CUDA_VISIBLE_DEVICES").is_ok(),
        active_jobs,
        model_cached: state.backend.is_ready().await,
    }))
}

/// A capability descriptor: which modality this plugin instance mints
/// jobs for, plus a redacted config summary for operator debugging.
#[utoipa::path(
    get,
    path = "/manifest",
    tag = "Health",
    responses((status = 200, description = "Redacted configuration and capability summary", body = Object))
)]
pub async fn manifest(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut summary = state.config.redacted_summary();
    if let serde_json::Value::Object(ref mut map) = summary {
        map.insert("modality".to_string(), serde_json::Value::String(state.modality.to_string()));
        map.insert("scheduler_depth".to_string(), serde_json::json!(state.scheduler.len()));
    }
    Json(summary)
}
