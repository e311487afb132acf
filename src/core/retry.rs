//! Bounded fixed-interval retry for row-store visibility lag.
//!
//! The spreadsheet backend is eventually consistent: a row appended by
//! one call may not be visible to the next read. Lookups therefore
//! re-read on a fixed interval a bounded number of times. This is
//! deliberately not exponential backoff — the lag is short and flat,
//! and the admin is usually waiting on the other end.

use std::future::Future;
use std::time::Duration;

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetry {
    /// Re-attempts after the initial try
    pub attempts: u32,
    /// Pause between attempts
    pub interval: Duration,
}

impl FixedRetry {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// Runs `operation` until it returns `Some`, re-trying on the policy's
/// fixed interval. Returns `None` once attempts are exhausted.
///
/// The operation itself decides what "not yet" means (a miss on a row
/// scan); hard errors should be surfaced by the caller instead of
/// being funneled through here.
pub async fn retry_until_some<F, Fut, T>(policy: FixedRetry, mut operation: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    if let Some(value) = operation().await {
        return Some(value);
    }
    for attempt in 1..=policy.attempts {
        tokio::time::sleep(policy.interval).await;
        if let Some(value) = operation().await {
            if attempt > 1 {
                log::debug!("lookup converged after {} re-reads", attempt);
            }
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_first_try() {
        let policy = FixedRetry::new(3, Duration::from_millis(1));
        let result = retry_until_some(policy, || async { Some(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn converges_after_misses() {
        let policy = FixedRetry::new(5, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_until_some(policy, || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 3 {
                    None
                } else {
                    Some("row")
                }
            }
        })
        .await;
        assert_eq!(result, Some("row"));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhausts_and_returns_none() {
        let policy = FixedRetry::new(2, Duration::from_millis(1));
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result: Option<i32> = retry_until_some(policy, || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                None
            }
        })
        .await;
        assert_eq!(result, None);
        // 1 initial + 2 retries
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
