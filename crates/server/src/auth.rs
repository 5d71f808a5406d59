//! Shared-secret auth layer for job-mutating routes.
//!
//! Exact string equality against the `x-internal-secret` header. A
//! plugin that never configures `INTERNAL_API_SECRET` runs open, so
//! local development stays frictionless without a hard startup
//! failure.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use auris_core::AurisError;

use crate::error::ApiError;
use crate::state::AppState;

const SECRET_HEADER: &str = "x-internal-secret";

pub async fn require_secret(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = &state.config.server.internal_api_secret else {
        return Ok(next.run(request).await);
    };

    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if provided != Some(expected.as_str()) {
        return Err(ApiError(AurisError::Unauthorized));
    }
    Ok(next.run(request).await)
}
