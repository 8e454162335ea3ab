use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::RecommendationReport,
    routes::AppState,
    services::RecommendationOverrides,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Fixes the jitter sequence for a reproducible ranking
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationReport>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %request.user_id,
        top_n = ?request.top_n,
        "Processing recommendation request"
    );

    let overrides = RecommendationOverrides {
        top_n: request.top_n,
        seed: request.seed,
    };
    let report = state
        .recommender
        .recommend(&request.user_id, overrides)
        .await?;

    tracing::info!(
        request_id = %request_id,
        run_id = %report.run_id,
        entries = report.entries.len(),
        warnings = report.warnings.len(),
        "Recommendation request completed"
    );

    Ok(Json(report))
}
