//! REST API server module
//!
//! Exposes the batch download endpoint plus health, statistics and the
//! OpenAPI document.

use crate::batch::BatchDownloader;
use crate::{Config, Result};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
    middleware,
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Orders (behind the API key when one is configured)
/// - `GET /orders/:order_id/images` - Download all images of an order as a ZIP
///
/// ## System
/// - `GET /api/stats` - Statistics snapshot (behind the API key when configured)
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());
    let api = &config.server.api;

    let protected = Router::new()
        .route("/orders/:order_id/images", get(routes::download_order_images))
        .route("/api/stats", get(routes::get_stats))
        .with_state(state.clone());

    let protected = if api.api_key.is_some() {
        protected.layer(middleware::from_fn_with_state(
            api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        protected
    };

    let public = Router::new()
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // SwaggerUi serves its own copy of the document; keep it off /openapi.json
    let public = if api.swagger_ui {
        public.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        public
    };

    let router = public
        .with_state(state)
        .merge(protected)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ))
        .layer(TraceLayer::new_for_http());

    if api.cors_enabled {
        router.layer(build_cors_layer(&api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. The batch count headers are
/// exposed so browser clients can read them.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let exposed = [
        HeaderName::from_static(routes::X_TOTAL_IMAGES),
        HeaderName::from_static(routes::X_DOWNLOADED),
        HeaderName::from_static(routes::X_FAILED),
        header::CONTENT_DISPOSITION,
    ];

    let allow_any = origins.iter().any(|o| o == "*");
    let allow_origin = if allow_any || origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed)
}

/// Start the API server on the configured bind address
///
/// Serves until `shutdown` resolves, then stops accepting connections and
/// lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use order_batch_dl::{BatchDownloader, Config, Stats, UpstreamClient};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let client = Arc::new(UpstreamClient::new(&config.upstream)?);
/// let downloader = Arc::new(BatchDownloader::new(client, &config, Stats::new()));
///
/// order_batch_dl::api::start_api_server(downloader, config, async {
///     let _ = tokio::signal::ctrl_c().await;
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(
    downloader: Arc<BatchDownloader>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, downloader, config, shutdown).await
}

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    downloader: Arc<BatchDownloader>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let app = create_router(downloader, config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
