//! order-batch-dl server binary
//!
//! Loads configuration (optional JSON file plus environment, `.env` honoured),
//! then serves the REST API until SIGTERM or SIGINT.

use order_batch_dl::{BatchDownloader, Config, Stats, UpstreamClient, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal outside development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::load()?);
    tracing::info!(
        upstream = %config.upstream.base_url,
        permits = config.batch.max_concurrent_downloads,
        max_assets = config.batch.max_assets_per_order,
        "Configuration loaded"
    );

    let client = Arc::new(UpstreamClient::new(&config.upstream)?);
    let downloader = Arc::new(BatchDownloader::new(client, &config, Stats::new()));

    run_with_shutdown(downloader, config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
