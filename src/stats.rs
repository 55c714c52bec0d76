//! Process-wide batch statistics
//!
//! Counters only move through the `record_*` methods, each of which holds the
//! internal lock for the whole update. Readers get an owned [`StatsSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use utoipa::ToSchema;

/// Number of recent errors retained
pub const RECENT_ERRORS_CAPACITY: usize = 20;

/// Number of recent errors included in a snapshot
pub const RECENT_ERRORS_IN_SNAPSHOT: usize = 5;

/// A batch that failed wholly or partly
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecentError {
    /// When the batch finished
    #[schema(value_type = String, format = DateTime)]
    pub time: DateTime<Utc>,
    /// Order the batch belonged to
    pub order_id: String,
    /// Summary of what went wrong
    pub error: String,
    /// Number of assets that failed
    pub count: usize,
}

/// Point-in-time copy of the statistics
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatsSnapshot {
    /// Seconds since the recorder was created
    pub uptime_seconds: u64,
    /// Batches that reached a verdict (served or totally failed)
    pub orders_processed: u64,
    /// Assets written into served archives
    pub images_downloaded: u64,
    /// Assets that failed across all batches
    pub images_failed: u64,
    /// Archives returned to callers
    pub zips_served: u64,
    /// Batches in which every asset failed
    pub batches_failed: u64,
    /// Orders created through this service
    pub orders_created: u64,
    /// Assets uploaded while creating orders
    pub images_uploaded: u64,
    /// Most recent errors, oldest first (omitted unless requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_errors: Option<Vec<RecentError>>,
}

#[derive(Debug, Default)]
struct Counters {
    orders_processed: u64,
    images_downloaded: u64,
    images_failed: u64,
    zips_served: u64,
    batches_failed: u64,
    orders_created: u64,
    images_uploaded: u64,
    errors: VecDeque<RecentError>,
}

impl Counters {
    fn push_error(&mut self, order_id: &str, error: String, count: usize) {
        if self.errors.len() == RECENT_ERRORS_CAPACITY {
            self.errors.pop_front();
        }
        self.errors.push_back(RecentError {
            time: Utc::now(),
            order_id: order_id.to_string(),
            error,
            count,
        });
    }
}

/// Shared statistics recorder (cheap to clone)
#[derive(Clone, Debug)]
pub struct Stats {
    counters: Arc<Mutex<Counters>>,
    started_at: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    /// Create an empty recorder; uptime starts now
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Mutex::new(Counters::default())),
            started_at: Instant::now(),
        }
    }

    /// Record a served archive, possibly with partial failures
    pub async fn record_batch_complete(
        &self,
        order_id: &str,
        total: usize,
        downloaded: usize,
        failed: usize,
    ) {
        let mut counters = self.counters.lock().await;
        counters.orders_processed += 1;
        counters.images_downloaded += downloaded as u64;
        counters.images_failed += failed as u64;
        counters.zips_served += 1;
        if failed > 0 {
            counters.push_error(
                order_id,
                format!("Partial failure: {failed}/{total} images failed"),
                failed,
            );
        }
    }

    /// Record a batch in which every asset failed
    pub async fn record_batch_total_failure(&self, order_id: &str, failed: usize) {
        let mut counters = self.counters.lock().await;
        counters.orders_processed += 1;
        counters.images_failed += failed as u64;
        counters.batches_failed += 1;
        counters.push_error(order_id, "All images failed".to_string(), failed);
    }

    /// Record creation of a new order
    pub async fn record_order_created(&self, images_uploaded: usize) {
        let mut counters = self.counters.lock().await;
        counters.orders_created += 1;
        counters.images_uploaded += images_uploaded as u64;
    }

    /// Copy the current counters
    pub async fn snapshot(&self, include_errors: bool) -> StatsSnapshot {
        let counters = self.counters.lock().await;
        let recent_errors = include_errors.then(|| {
            let skip = counters.errors.len().saturating_sub(RECENT_ERRORS_IN_SNAPSHOT);
            counters.errors.iter().skip(skip).cloned().collect()
        });

        StatsSnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            orders_processed: counters.orders_processed,
            images_downloaded: counters.images_downloaded,
            images_failed: counters.images_failed,
            zips_served: counters.zips_served,
            batches_failed: counters.batches_failed,
            orders_created: counters.orders_created,
            images_uploaded: counters.images_uploaded,
            recent_errors,
        }
    }
}
