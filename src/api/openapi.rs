//! OpenAPI documentation and schema generation
//!
//! The spec is generated at compile time by utoipa and served at
//! `/openapi.json` (and through `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the order-batch-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "order-batch-dl REST API",
        version = "0.1.0",
        description = "Batch download of an order's enhanced images as a single ZIP archive, with per-image failure reporting",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Orders
        crate::api::routes::download_order_images,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_stats,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ImageFormat,
        crate::types::ReportEntry,
        crate::types::BatchCounts,

        // Stats
        crate::stats::StatsSnapshot,
        crate::stats::RecentError,

        // API response types from routes
        crate::api::routes::HealthResponse,
        crate::api::routes::StatsResponse,
        crate::api::routes::StatsLimits,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "orders", description = "Order downloads - Fetch every enhanced image of an order as one archive"),
        (name = "system", description = "System endpoints - Health checks, statistics, OpenAPI spec"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
