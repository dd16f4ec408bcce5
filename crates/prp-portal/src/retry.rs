//! Bounded retry for store updates that are safe to repeat.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use prp_core::error::{PortalError, PortalResult};

use crate::config::PortalConfig;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// configured attempt budget is spent.
///
/// Delays start at `store_retry_backoff_ms` and double per retry, with
/// jitter. `store_retry_attempts` counts the first try.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &PortalConfig,
    operation: &'static str,
    op: F,
) -> PortalResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortalResult<T>>,
{
    // backon counts retries, not attempts.
    let max_retries = config.store_retry_attempts.saturating_sub(1) as usize;
    let min_delay = Duration::from_millis(config.store_retry_backoff_ms);

    let backoff = ExponentialBuilder::new()
        .with_min_delay(min_delay)
        .with_max_delay(min_delay.saturating_mul(16))
        .with_factor(2.0)
        .with_jitter()
        .with_max_times(max_retries);

    op.retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|e: &PortalError| e.is_retryable())
        .notify(|err: &PortalError, dur: Duration| {
            tracing::warn!(
                operation,
                backoff_ms = dur.as_millis() as u64,
                error = %err,
                "transient store error, retrying"
            );
        })
        .await
}
