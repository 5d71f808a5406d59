use std::collections::HashMap;
use std::sync::Arc;

use auris_core::AurisError;
use auris_vector::{ModalityWeight, RecommendationEntry, RecommendationRequest, VectorModality};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecommendRequestBody {
    pub subject_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub diversity: f32,
    #[serde(default)]
    pub weights: HashMap<String, f32>,
}

fn default_limit() -> usize {
    20
}

#[utoipa::path(
    post,
    path = "/recommendations",
    tag = "Recommendations",
    request_body = RecommendRequestBody,
    responses(
        (status = 200, description = "Ranked recommendations", body = Object),
        (status = 503, description = "Vector store not configured for this plugin instance")
    )
)]
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RecommendRequestBody>,
) -> Result<Json<Vec<RecommendationEntry>>, ApiError> {
    let engine = state
        .recommender
        .as_ref()
        .ok_or_else(|| AurisError::StoreUnavailable("vector store not configured".to_string()))?;

    let mut weights = Vec::with_capacity(body.weights.len());
    for (tag, weight) in &body.weights {
        let modality = VectorModality::parse(tag).map_err(AurisError::from)?;
        weights.push(ModalityWeight { modality, weight: *weight });
    }

    let req = RecommendationRequest {
        subject_id: body.subject_id,
        weights,
        limit: body.limit,
        diversity: body.diversity,
    };
    let entries = engine.recommend(&req).await.map_err(AurisError::from)?;
    Ok(Json(entries))
}
