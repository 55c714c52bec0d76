//! Application state for the API server

use crate::Config;
use crate::batch::BatchDownloader;
use crate::stats::Stats;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (Arc clones only). The batch downloader and its stats
/// recorder are the only state shared between concurrent requests.
#[derive(Clone)]
pub struct AppState {
    /// Batch download engine
    pub downloader: Arc<BatchDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }

    /// Process-wide statistics
    pub fn stats(&self) -> &Stats {
        self.downloader.stats()
    }
}
