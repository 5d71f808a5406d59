//! Downloader-only surface: source-catalog search plus pause/resume
//! stubs alongside the shared cancel path.
//!
//! `pause`/`resume` exist as routes because downloader deployments are
//! expected to expose them, but the underlying `Downloader` trait has
//! no suspend primitive — a subprocess download either completes or is
//! cancelled. Both report `conflict` rather than silently no-opping.

use std::sync::Arc;

use auris_backend::IdentifyCandidate;
use auris_core::{AurisError, JobEnvelope, JobId, JobStatus};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct IdentifyParams {
    pub q: String,
    #[serde(default = "default_identify_limit")]
    pub limit: usize,
}

fn default_identify_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDownloadsParams {
    pub status: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    20
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<JobStatus>, ApiError> {
    let Some(raw) = raw else { return Ok(None) };
    match raw {
        "pending" => Ok(Some(JobStatus::Pending)),
        "processing" => Ok(Some(JobStatus::Processing)),
        "completed" => Ok(Some(JobStatus::Completed)),
        "failed" => Ok(Some(JobStatus::Failed)),
        "cancelled" => Ok(Some(JobStatus::Cancelled)),
        other => Err(ApiError(AurisError::Validation(format!("unknown status filter '{other}'")))),
    }
}

/// Downloader-only: other modalities expose single-job status lookups,
/// not a history listing.
#[utoipa::path(
    get,
    path = "/downloads",
    tag = "Downloads",
    params(ListDownloadsParams),
    responses((status = 200, description = "Most recent jobs, newest first", body = Object))
)]
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDownloadsParams>,
) -> Result<Json<Vec<JobEnvelope>>, ApiError> {
    let status = parse_status_filter(params.status.as_deref())?;
    let jobs = state.store.list_recent(status, params.limit).await.map_err(AurisError::from)?;
    Ok(Json(jobs.into_iter().map(|j| j.to_envelope()).collect()))
}

#[utoipa::path(
    get,
    path = "/identify",
    tag = "Downloads",
    params(IdentifyParams),
    responses(
        (status = 200, description = "Source-catalog matches for the query", body = Object),
        (status = 400, description = "This plugin instance has no downloader back-end")
    )
)]
pub async fn identify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdentifyParams>,
) -> Result<Json<Vec<IdentifyCandidate>>, ApiError> {
    let downloader = state
        .backend
        .as_downloader()
        .ok_or_else(|| AurisError::Validation("this plugin instance has no downloader back-end".to_string()))?;
    let candidates = downloader.identify(&params.q, params.limit).await.map_err(AurisError::from)?;
    Ok(Json(candidates))
}

#[utoipa::path(
    post,
    path = "/downloads/{id}/pause",
    tag = "Downloads",
    params(("id" = String, Path, description = "Job identifier")),
    responses((status = 400, description = "This back-end has no suspend primitive"))
)]
pub async fn pause_download(Path(id): Path<JobId>) -> Result<(), ApiError> {
    Err(ApiError(AurisError::Conflict(format!(
        "job {id} cannot be paused: this back-end has no suspend primitive"
    ))))
}

#[utoipa::path(
    post,
    path = "/downloads/{id}/resume",
    tag = "Downloads",
    params(("id" = String, Path, description = "Job identifier")),
    responses((status = 400, description = "This back-end has no suspend primitive"))
)]
pub async fn resume_download(Path(id): Path<JobId>) -> Result<(), ApiError> {
    Err(ApiError(AurisError::Conflict(format!(
        "job {id} cannot be resumed: this back-end has no suspend primitive"
    ))))
}
