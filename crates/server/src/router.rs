//! HTTP router construction.
//!
//! Assembles the Job API, the downloader extension, the recommendation
//! endpoint and the health/manifest surface into a single `Router`:
//! per-concern route groups merged together, `CorsLayer::permissive()`,
//! and a shared-secret auth layer scoped only to the routes that mint,
//! inspect, or cancel jobs.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::auth::require_secret;
use crate::doc::ApiDoc;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/jobs", post(api::create_job))
        .route("/jobs/{id}", get(api::get_job).delete(api::cancel_job))
        .route("/downloads", post(api::create_job).get(api::list_downloads))
        .route("/downloads/{id}/cancel", post(api::cancel_job))
        .route("/downloads/{id}/pause", post(api::pause_download))
        .route("/downloads/{id}/resume", post(api::resume_download))
        .route("/identify", get(api::identify))
        .route("/events", post(api::ingest_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret));

    let public = Router::new()
        .route("/health", get(api::health))
        .route("/manifest", get(api::manifest))
        .route("/recommendations", post(api::recommend));

    Router::new()
        .merge(protected)
        .merge(public)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
