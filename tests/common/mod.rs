//! Common test utilities for order-batch-dl integration tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;

use order_batch_dl::{BatchDownloader, Config, Stats, UpstreamClient};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Order ID used by every fixture
pub const ORDER_ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";

/// Configuration pointing at `server`, with a 10 ms retry delay
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = server.uri();
    config.upstream.api_key = Some("integration-key".to_string());
    config.upstream.request_timeout = Duration::from_secs(5);
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(10);
    config
}

/// Build a downloader backed by the real upstream client
pub fn downloader_for(config: &Config) -> BatchDownloader {
    #[allow(clippy::expect_used)]
    let client = UpstreamClient::new(&config.upstream).expect("client builds from valid config");
    BatchDownloader::new(Arc::new(client), config, Stats::new())
}
