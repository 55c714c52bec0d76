//! Batch download engine: one order in, one archive (or a structured failure) out.
//!
//! Split into focused submodules:
//! - [`worker`] - Single-asset download with retry
//! - [`limiter`] - Per-batch permit pool yielding completions in arrival order
//! - [`archive`] - Incremental ZIP assembly with memory-to-disk spill
//! - [`outcome`] - Success/failure tally, verdict and download report

pub mod archive;
mod limiter;
pub mod outcome;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use archive::{ArchiveBody, ArchiveWriter, REPORT_ENTRY_NAME};
pub use outcome::{BatchVerdict, OutcomeAggregator};

use crate::config::{BatchConfig, Config, RetryConfig};
use crate::error::{Error, Result};
use crate::resolver::{ResolvedOrder, resolve_order};
use crate::stats::Stats;
use crate::types::{BatchCounts, DownloadOutcome, DownloadParams, OrderId};
use crate::upstream::AssetSource;
use futures::StreamExt;
use std::sync::Arc;

/// A served batch: the finished archive plus response metadata
#[derive(Debug)]
pub struct BatchArchive {
    /// Order the archive belongs to
    pub order_id: OrderId,
    /// Display name of the order
    pub order_name: String,
    /// Total / downloaded / failed counts
    pub counts: BatchCounts,
    /// The archive itself
    pub body: ArchiveBody,
}

/// Runs batch downloads against an [`AssetSource`]
///
/// Cheap to share behind an `Arc`. Each [`run`](Self::run) gets its own permit
/// pool; only the source and the stats recorder are shared between batches.
pub struct BatchDownloader {
    source: Arc<dyn AssetSource>,
    batch: BatchConfig,
    retry: RetryConfig,
    stats: Stats,
}

impl BatchDownloader {
    /// Create a downloader using the batch and retry sections of `config`
    pub fn new(source: Arc<dyn AssetSource>, config: &Config, stats: Stats) -> Self {
        Self {
            source,
            batch: config.batch.clone(),
            retry: config.retry.clone(),
            stats,
        }
    }

    /// The stats recorder this downloader reports into
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Batch limits in effect
    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch
    }

    /// Resolve an order and download all of its assets into an archive
    ///
    /// Per-asset failures are collected into the archive's report. The call only
    /// fails for request-level problems: invalid parameters, order lookup
    /// failures, and batches in which nothing could be downloaded.
    pub async fn run(&self, order_id: &OrderId, params: &DownloadParams) -> Result<BatchArchive> {
        params.validate()?;

        let order = resolve_order(
            self.source.as_ref(),
            order_id,
            params.dev_mode,
            self.batch.max_assets_per_order,
        )
        .await?;

        self.download_order(order, params).await
    }

    /// Download the assets of an already resolved order
    pub async fn download_order(
        &self,
        order: ResolvedOrder,
        params: &DownloadParams,
    ) -> Result<BatchArchive> {
        let ResolvedOrder {
            order_id,
            name: order_name,
            references,
        } = order;

        let mut aggregator = OutcomeAggregator::new(references.len());
        let mut writer = ArchiveWriter::new(self.batch.spill_threshold_bytes, params.format);

        let source = self.source.as_ref();
        let retry = &self.retry;
        let mut outcomes = std::pin::pin!(limiter::completion_stream(
            references,
            self.batch.max_concurrent_downloads,
            move |reference| worker::download_asset(source, reference, params, retry),
        ));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                DownloadOutcome::Success {
                    reference,
                    bytes,
                    content_type,
                    ..
                } => {
                    let entry = writer.add_asset(&reference, &bytes, content_type.as_deref())?;
                    tracing::debug!(asset_id = %reference.id, entry = %entry, "added archive entry");
                    aggregator.record_success();
                }
                DownloadOutcome::Failure {
                    reference,
                    reason,
                    http_status,
                    ..
                } => aggregator.record_failure(&reference, &reason, http_status),
            }
        }
        debug_assert!(aggregator.is_settled());

        let counts = aggregator.counts();
        if aggregator.verdict() == BatchVerdict::TotalFailure {
            tracing::warn!(
                order_id = %order_id,
                failed = counts.failed,
                "no images could be downloaded"
            );
            self.stats
                .record_batch_total_failure(order_id.as_str(), counts.failed)
                .await;
            return Err(Error::TotalBatchFailure {
                order_id: order_id.to_string(),
                failures: aggregator.into_failures(),
            });
        }

        if let Some(report) = aggregator.report(&order_name) {
            writer.add_report(&report)?;
        }
        let body = writer.finish()?;

        self.stats
            .record_batch_complete(
                order_id.as_str(),
                counts.total,
                counts.downloaded,
                counts.failed,
            )
            .await;

        tracing::info!(
            order_id = %order_id,
            downloaded = counts.downloaded,
            failed = counts.failed,
            bytes = body.len(),
            on_disk = body.is_on_disk(),
            "returning archive"
        );

        Ok(BatchArchive {
            order_id,
            order_name,
            counts,
            body,
        })
    }
}
