//! Error types for order-batch-dl
//!
//! This module provides error handling for the library, including:
//! - Request-level errors (bad input, order lookup, zero-success batches)
//! - Per-asset download errors with retryable/non-retryable classification
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use crate::types::ReportEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for order-batch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for order-batch-dl
///
/// Only request-level failures live here. A single asset failing to download is an
/// [`AssetError`], which is recorded in the batch report and never aborts the batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch.max_concurrent_downloads")
        key: Option<String>,
    },

    /// Malformed request input, rejected before any upstream call
    #[error("{0}")]
    InvalidInput(String),

    /// The upstream service does not know the order
    #[error("order '{order_id}' not found")]
    OrderNotFound {
        /// The order ID that was looked up
        order_id: String,
    },

    /// The order exists but resolved to zero downloadable assets
    #[error("order '{name}' contains no images")]
    OrderEmpty {
        /// The order ID that was looked up
        order_id: String,
        /// Display name of the order (falls back to the order ID)
        name: String,
    },

    /// The order has more assets than a single batch is allowed to fetch
    #[error("order contains {count} images, exceeding the limit of {limit}")]
    TooManyAssets {
        /// Number of assets the order resolved to
        count: usize,
        /// Configured per-order limit
        limit: usize,
    },

    /// The upstream order lookup failed (network error, 5xx, or unexpected status)
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Every asset of a non-empty batch failed
    #[error("no images could be downloaded for order '{order_id}'")]
    TotalBatchFailure {
        /// The order ID of the failed batch
        order_id: String,
        /// Per-asset failure reasons, in the order they were observed
        failures: Vec<ReportEntry>,
    },

    /// Archive assembly error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Failure of a single asset download attempt
///
/// Classified by [`crate::retry::IsRetryable`]: server errors and transport failures are
/// transient, client errors are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Upstream answered with a non-success status
    #[error("HTTP {status}")]
    Status {
        /// The HTTP status code returned by the upstream service
        status: u16,
    },

    /// The request did not complete within the per-call timeout
    #[error("Download timed out")]
    Timeout,

    /// Connection could not be established or broke mid-transfer
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Upstream answered 2xx without any content
    #[error("Empty response body")]
    EmptyBody,
}

impl AssetError {
    /// The upstream HTTP status, if the failure carried one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AssetError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AssetError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AssetError::Timeout
        } else if let Some(status) = e.status() {
            AssetError::Status {
                status: status.as_u16(),
            }
        } else {
            AssetError::Connection(e.to_string())
        }
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "order_not_found",
///     "message": "order '100aefc4-8664-4180-9a97-42f428c6aace' not found",
///     "details": {
///       "order_id": "100aefc4-8664-4180-9a97-42f428c6aace"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_input", "total_batch_failure")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - rejected before any upstream call
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::OrderNotFound { .. } => 404,
            Error::OrderEmpty { .. } => 404,

            // 413 Payload Too Large
            Error::TooManyAssets { .. } => 413,

            // 422 Unprocessable Entity - nothing could be downloaded
            Error::TotalBatchFailure { .. } => 422,

            // 502 Bad Gateway - upstream service errors
            Error::UpstreamUnavailable(_) => 502,
            Error::Network(_) => 502,

            // 500 Internal Server Error
            Error::Config { .. } => 500,
            Error::Archive(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::OrderNotFound { .. } => "order_not_found",
            Error::OrderEmpty { .. } => "order_empty",
            Error::TooManyAssets { .. } => "too_many_assets",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::TotalBatchFailure { .. } => "total_batch_failure",
            Error::Archive(_) => "archive_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        let (message, details) = match &error {
            Error::OrderNotFound { order_id } => (
                error.to_string(),
                Some(serde_json::json!({ "order_id": order_id })),
            ),
            Error::OrderEmpty { order_id, name } => (
                error.to_string(),
                Some(serde_json::json!({ "order_id": order_id, "name": name })),
            ),
            Error::TooManyAssets { count, limit } => (
                format!("{error}. Use the single-image endpoint for large orders."),
                Some(serde_json::json!({ "count": count, "limit": limit })),
            ),
            Error::TotalBatchFailure { order_id, failures } => (
                "No images could be downloaded. They may still be processing.".to_string(),
                Some(serde_json::json!({
                    "order_id": order_id,
                    "total": failures.len(),
                    "failures": failures,
                })),
            ),
            // Internal details stay in the logs
            Error::Io(_) | Error::Archive(_) | Error::Config { .. } => {
                ("internal server error".to_string(), None)
            }
            _ => (error.to_string(), None),
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
