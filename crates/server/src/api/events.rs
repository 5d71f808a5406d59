//! Analytics event ingestion: accepts a batch of playback events and
//! hands them to the in-process channel the ingestion consumer drains.
//!
//! Fire-and-forget by design — a plugin instance with no Postgres
//! configured (`events_tx` is `None`) still returns `202`, it just has
//! nothing to record into.

use std::sync::Arc;

use auris_analytics::AnalyticsEvent;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestEventsRequest {
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<AnalyticsEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestEventsResponse {
    pub accepted: usize,
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "Analytics",
    request_body = IngestEventsRequest,
    responses(
        (status = 202, description = "Events accepted for asynchronous processing", body = IngestEventsResponse)
    )
)]
pub async fn ingest_events(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestEventsRequest>,
) -> (StatusCode, Json<IngestEventsResponse>) {
    let accepted = match &state.events_tx {
        Some(tx) => req.events.into_iter().filter(|e| tx.send(e.clone()).is_ok()).count(),
        None => 0,
    };
    (StatusCode::ACCEPTED, Json(IngestEventsResponse { accepted }))
}
