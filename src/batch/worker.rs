//! Single-asset download with retry

use crate::config::RetryConfig;
use crate::retry::download_with_retry;
use crate::types::{AssetReference, DownloadOutcome, DownloadParams};
use crate::upstream::AssetSource;
use std::sync::atomic::{AtomicU32, Ordering};

/// Download one asset, retrying transient failures per `retry`
///
/// Never fails: every terminal condition becomes a [`DownloadOutcome::Failure`].
pub(crate) async fn download_asset(
    source: &dyn AssetSource,
    reference: AssetReference,
    params: &DownloadParams,
    retry: &RetryConfig,
) -> DownloadOutcome {
    let counter = AtomicU32::new(0);
    let (attempted, target) = (&counter, &reference);

    let result = download_with_retry(retry, move || {
        attempted.fetch_add(1, Ordering::Relaxed);
        source.fetch_asset(target, params)
    })
    .await;

    let attempts = counter.into_inner();
    match result {
        Ok(fetched) => {
            tracing::info!(
                asset_id = %reference.id,
                name = %reference.name,
                attempts,
                bytes = fetched.bytes.len(),
                "downloaded image"
            );
            DownloadOutcome::Success {
                reference,
                bytes: fetched.bytes,
                content_type: fetched.content_type,
                attempts,
            }
        }
        Err(e) => {
            tracing::warn!(
                asset_id = %reference.id,
                name = %reference.name,
                attempts,
                error = %e,
                "failed to download image"
            );
            DownloadOutcome::Failure {
                http_status: e.http_status(),
                reason: e.to_string(),
                reference,
                attempts,
            }
        }
    }
}
