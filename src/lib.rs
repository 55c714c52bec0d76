//! # order-batch-dl
//!
//! Batch download of an order's enhanced images as one ZIP archive.
//!
//! A request resolves the order's asset list from the upstream API, downloads
//! every asset under a fixed permit pool, and streams successes into an archive
//! as they complete. Assets that fail are listed in a `_download_report.txt`
//! entry; only when every asset fails does the request fail as a whole.
//!
//! ## Pipeline
//!
//! - [`resolver`] - fetch and normalise the order record
//! - [`batch`] - worker, limiter, archive writer and outcome aggregation
//! - [`stats`] - process-wide counters
//! - [`api`] - the axum HTTP surface
//!
//! ## Quick Start
//!
//! ```no_run
//! use order_batch_dl::{BatchDownloader, Config, DownloadParams, OrderId, Stats, UpstreamClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = Arc::new(UpstreamClient::new(&config.upstream)?);
//!     let downloader = BatchDownloader::new(client, &config, Stats::new());
//!
//!     let order_id = OrderId::parse("100aefc4-8664-4180-9a97-42f428c6aace")?;
//!     let archive = downloader.run(&order_id, &DownloadParams::default()).await?;
//!     println!(
//!         "{}: {}/{} images, {} bytes",
//!         archive.order_name,
//!         archive.counts.downloaded,
//!         archive.counts.total,
//!         archive.body.len()
//!     );
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Batch download engine
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Order record resolution
pub mod resolver;
/// Retry logic with backoff
pub mod retry;
/// Batch statistics
pub mod stats;
/// Core types
pub mod types;
/// Upstream API client
pub mod upstream;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::{BatchArchive, BatchDownloader, BatchVerdict};
pub use config::{BatchConfig, Config, RetryConfig, ServerConfig, UpstreamConfig};
pub use error::{ApiError, AssetError, Error, ErrorDetail, Result, ToHttpStatus};
pub use resolver::ResolvedOrder;
pub use stats::{Stats, StatsSnapshot};
pub use types::{
    AssetReference, BatchCounts, DownloadOutcome, DownloadParams, ImageFormat, OrderId,
    ReportEntry,
};
pub use upstream::{AssetSource, UpstreamClient};

/// Serve the API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Example
///
/// ```no_run
/// use order_batch_dl::{BatchDownloader, Config, Stats, UpstreamClient, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Arc::new(Config::load()?);
///     let client = Arc::new(UpstreamClient::new(&config.upstream)?);
///     let downloader = Arc::new(BatchDownloader::new(client, &config, Stats::new()));
///
///     run_with_shutdown(downloader, config).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    downloader: std::sync::Arc<BatchDownloader>,
    config: std::sync::Arc<Config>,
) -> Result<()> {
    api::start_api_server(downloader, config, wait_for_signal()).await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
