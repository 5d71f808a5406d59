//! Create / status / cancel for the single job modality this plugin
//! instance serves.

use std::sync::Arc;

use auris_core::{AurisError, Job, JobEnvelope, JobId, JobStatus, Priority};
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    pub subject_id: String,
    #[schema(value_type = Object)]
    pub input_descriptor: serde_json::Value,
    #[serde(default)]
    pub priority: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub status: &'static str,
}

/// `find_by_subject` short-circuits a repeat `create` onto the existing
/// job whenever it hasn't reached a terminal state other than
/// `completed` — this is the dedup guarantee, not an optimization.
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "Jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job created or deduplicated onto an existing one", body = Object),
        (status = 429, description = "Plugin instance is in back-pressure cooldown")
    )
)]
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<JobEnvelope>, ApiError> {
    if state.store.in_cooldown().await.map_err(AurisError::from)? {
        return Err(ApiError(AurisError::RateLimited));
    }

    if let Some(existing) = state.store.find_by_subject(&req.subject_id).await.map_err(AurisError::from)? {
        if existing.is_dedup_candidate() {
            return Ok(Json(existing.to_envelope()));
        }
    }

    let priority = req.priority.and_then(Priority::from_i32).unwrap_or_default();
    let job = Job::new(req.subject_id, state.modality, req.input_descriptor, priority);
    state.store.save(&job).await.map_err(AurisError::from)?;
    state.scheduler.enqueue(job.priority, job.id);
    Ok(Json(job.to_envelope()))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Current job envelope", body = Object),
        (status = 404, description = "No job with that id")
    )
)]
pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<JobId>) -> Result<Json<JobEnvelope>, ApiError> {
    let job = state
        .store
        .get(id)
        .await
        .map_err(AurisError::from)?
        .ok_or_else(|| AurisError::NotFound(id.to_string()))?;
    Ok(Json(job.to_envelope()))
}

/// Cooperative for `processing` jobs: the worker observes the
/// cancellation token between steps, it does not stop mid-inference.
#[utoipa::path(
    delete,
    path = "/jobs/{id}",
    tag = "Jobs",
    params(("id" = String, Path, description = "Job identifier")),
    responses(
        (status = 200, description = "Job cancelled", body = CancelResponse),
        (status = 400, description = "Job is already in a terminal state"),
        (status = 404, description = "No job with that id")
    )
)]
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<Json<CancelResponse>, ApiError> {
    let mut job = state
        .store
        .get(id)
        .await
        .map_err(AurisError::from)?
        .ok_or_else(|| AurisError::NotFound(id.to_string()))?;

    if !matches!(job.status, JobStatus::Pending | JobStatus::Processing) {
        return Err(ApiError(AurisError::Conflict(format!("job {id} is already {}", job.status))));
    }
    let was_processing = job.status == JobStatus::Processing;
    if !job.transition(JobStatus::Cancelled, Utc::now()) {
        return Err(ApiError(AurisError::Conflict(format!("job {id} cannot be cancelled from {}", job.status))));
    }
    state.store.save(&job).await.map_err(AurisError::from)?;
    if was_processing {
        state.worker_pool.cancellations().cancel(id);
    }
    Ok(Json(CancelResponse { status: "cancelled" }))
}
