//! Retry/backoff driver.
//!
//! Transient ledger/store failures are retried with exponential backoff and
//! 10-30% jitter added on top of the capped delay. Non-transient failures
//! (as judged by `InboxError::is_transient`) are never retried — they
//! surface immediately to the caller.

use std::future::Future;
use std::time::Duration;

use inbox_core::InboxError;
use rand::Rng;

/// Backoff parameters for one call site. `base_delay_ms` is the delay before
/// the first retry; each subsequent attempt doubles it up to `max_delay_ms`.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay before retry attempt `attempt` (1-indexed): `d + jitter`, where
    /// `d = min(max_delay_ms, base_delay_ms * 2^(attempt-1))` and jitter is
    /// uniform in `[0.1*d, 0.3*d]`, so the result lies in `[d, 1.3*d]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(32));
        let d = exp.min(self.max_delay_ms);
        let jitter_floor = (d as f64 * 0.1).round() as u64;
        let jitter_ceiling = (d as f64 * 0.3).round() as u64;
        let jitter = if jitter_ceiling > jitter_floor {
            rand::thread_rng().gen_range(jitter_floor..=jitter_ceiling)
        } else {
            jitter_floor
        };
        Duration::from_millis(d + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 200, 5_000)
    }
}

/// Runs `op` under `policy`, retrying while the error is transient
/// (`InboxError::is_transient`) and attempts remain. Sleeps between
/// attempts; logs each retry at `warn`.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T, InboxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InboxError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if attempt < policy.max_retries && err.is_transient() => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    target: "inbox_support::retry",
                    label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_lies_within_d_to_1_3d() {
        let policy = RetryPolicy::new(10, 100, 1_000);
        for attempt in 1u32..=20 {
            let exp = policy
                .base_delay_ms
                .saturating_mul(1u64 << attempt.min(32).saturating_sub(1));
            let d = exp.min(policy.max_delay_ms);
            let observed = policy.delay_for_attempt(attempt).as_millis() as u64;
            assert!(observed >= d, "attempt {attempt}: {observed} < d={d}");
            assert!(
                observed <= (d as f64 * 1.3).ceil() as u64,
                "attempt {attempt}: {observed} > 1.3*d={d}"
            );
        }
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, 1, 2);

        let result = retry(policy, "test-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(InboxError::Transport {
                        method: "test".into(),
                        message: "connection reset".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, 1, 2);

        let result: Result<(), InboxError> = retry(policy, "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(InboxError::UnknownAccount("acc://x".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, 1, 2);

        let result: Result<(), InboxError> = retry(policy, "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(InboxError::Transport {
                    method: "test".into(),
                    message: "timeout".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        // initial attempt + 2 retries = 3 calls
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    proptest::proptest! {
        /// Delay for attempt k lies in [d, 1.3*d].
        #[test]
        fn delay_for_attempt_always_within_bound(
            base_delay_ms in 1u64..5_000,
            max_delay_ms in 1u64..60_000,
            attempt in 1u32..20,
        ) {
            let policy = RetryPolicy::new(5, base_delay_ms, max_delay_ms);
            let exp = policy
                .base_delay_ms
                .saturating_mul(1u64 << attempt.min(32).saturating_sub(1));
            let d = exp.min(policy.max_delay_ms);
            let observed = policy.delay_for_attempt(attempt).as_millis() as u64;
            proptest::prop_assert!(observed >= d);
            proptest::prop_assert!(observed <= (d as f64 * 1.3).ceil() as u64 + 1);
        }
    }
}
