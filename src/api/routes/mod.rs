//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`orders`] - Batch download of an order's images
//! - [`system`] - Health, stats, OpenAPI

use crate::types::{DownloadParams, ImageFormat};
use serde::{Deserialize, Serialize};

mod orders;
mod system;

pub use orders::*;
pub use system::*;

/// Query parameters for GET /orders/:order_id/images
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImagesQuery {
    /// Output image format (default: jpeg)
    #[serde(default)]
    #[param(value_type = Option<String>, example = "jpeg")]
    pub format: ImageFormat,

    /// Image quality 1-90 (default: upstream default)
    #[serde(default)]
    #[param(minimum = 1, maximum = 90)]
    pub quality: Option<u8>,

    /// Download free preview-quality images; false consumes credits (default: true)
    #[serde(default = "default_preview")]
    pub preview: bool,

    /// Upstream development mode, watermarked output (default: false)
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_preview() -> bool {
    true
}

impl From<ImagesQuery> for DownloadParams {
    fn from(query: ImagesQuery) -> Self {
        DownloadParams {
            format: query.format,
            quality: query.quality,
            preview: query.preview,
            dev_mode: query.dev_mode,
        }
    }
}

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok" when the service answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether an upstream API key is configured
    pub api_key_configured: bool,
}

/// Batch limits reported by GET /api/stats
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StatsLimits {
    /// Maximum in-flight downloads per batch
    pub max_concurrent_downloads: usize,
    /// Maximum assets per order
    pub max_assets_per_order: usize,
}

/// Response body for GET /api/stats
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    /// Counter snapshot
    #[serde(flatten)]
    pub stats: crate::stats::StatsSnapshot,
    /// Configured limits
    pub limits: StatsLimits,
}
