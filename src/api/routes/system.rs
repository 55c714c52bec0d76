//! System handlers: health, stats, OpenAPI.

use super::{HealthResponse, StatsLimits, StatsResponse};
use crate::api::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        api_key_configured: state.config.upstream.api_key.is_some(),
    })
}

/// GET /api/stats - Batch statistics and limits
///
/// Recent errors are only included when the API is protected by a key.
#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "system",
    responses(
        (status = 200, description = "Statistics snapshot", body = StatsResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let include_errors = state.config.server.api.api_key.is_some();
    let batch = state.downloader.batch_config();

    Json(StatsResponse {
        stats: state.stats().snapshot(include_errors).await,
        limits: StatsLimits {
            max_concurrent_downloads: batch.max_concurrent_downloads,
            max_assets_per_order: batch.max_assets_per_order,
        },
    })
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
