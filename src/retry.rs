//! Retry logic for transient asset download failures
//!
//! A failed asset download is retried only when the failure is transient: a 5xx
//! response, a timeout, or a broken connection. Client errors are deterministic and
//! are never retried. The default [`RetryConfig`] allows a single retry after a fixed
//! one second pause; exponential growth and jitter remain available through the config.
//!
//! # Example
//!
//! ```no_run
//! use order_batch_dl::retry::download_with_retry;
//! use order_batch_dl::config::RetryConfig;
//! use order_batch_dl::error::AssetError;
//!
//! # async fn example() -> Result<(), AssetError> {
//! let config = RetryConfig::default();
//! let bytes = download_with_retry(&config, || async {
//!     Ok::<_, AssetError>(vec![0xFF, 0xD8])
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::AssetError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for AssetError {
    fn is_retryable(&self) -> bool {
        match self {
            // Only server-side failures can change on a second attempt
            AssetError::Status { status } => *status >= 500,
            AssetError::Timeout => true,
            AssetError::Connection(_) => true,
            // Upstream answered successfully with nothing; asking again won't help
            AssetError::EmptyBody => false,
        }
    }
}

/// Execute an async operation, retrying transient failures
///
/// The operation runs once, then up to `config.max_attempts` more times while it
/// keeps failing with a retryable error. Delays start at `config.initial_delay`,
/// grow by `config.backoff_multiplier` and are capped at `config.max_delay`.
///
/// Returns the successful result or the last error.
pub async fn download_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
                        .unwrap_or(config.max_delay);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::warn!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::warn!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::try_from_secs_f64(jittered_secs).unwrap_or(delay)
}
