//! Maps `AurisError` onto HTTP responses via `IntoResponse`, returning
//! a `(StatusCode, Json<...>)` pair for every error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use auris_core::AurisError;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: &'static str,
}

pub struct ApiError(pub AurisError);

impl From<AurisError> for ApiError {
    fn from(e: AurisError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "not-found" => StatusCode::NOT_FOUND,
            "conflict" | "validation" => StatusCode::BAD_REQUEST,
            "rate-limited" => StatusCode::TOO_MANY_REQUESTS,
            "store-unavailable" | "back-end-unready" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiErrorBody { error: self.0.to_string(), kind: self.0.kind() };
        (status, Json(body)).into_response()
    }
}
