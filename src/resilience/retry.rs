//! Exponential backoff retry with jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{ResilienceError, Result};
use crate::shutdown::Shutdown;

/// Fraction of the exponential delay used as the jitter band.
const JITTER_FACTOR: f64 = 0.2;

/// Retries an operation with exponentially growing, jittered delays.
///
/// The attempt cursor is per-invocation; concurrent calls do not share state.
pub struct RetryManager {
    config: RetryConfig,
}

impl RetryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `base * 2^attempt`, plus uniform jitter of up to ±20%, clamped to
    /// `[base_delay, max_delay]`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay().as_secs_f64();
        let max = self.config.max_delay().as_secs_f64();
        let exp = base * 2f64.powi(attempt.min(62) as i32);
        let jitter = exp * JITTER_FACTOR * rand::thread_rng().gen_range(-1.0..=1.0);
        Duration::from_secs_f64((exp + jitter).clamp(base, max))
    }

    /// Run `f`, retrying on failure up to the configured cap.
    ///
    /// Returns the first success immediately. Sleeps between attempts are
    /// interruptible by `shutdown`, which aborts with a cancellation error.
    /// Exhaustion surfaces as [`ResilienceError::RetriesExhausted`] naming
    /// the attempt count and last error.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        operation: &str,
        shutdown: &Shutdown,
        mut f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.config.max_retries {
                        warn!(
                            operation,
                            attempts = attempt + 1,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(ResilienceError::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        }
                        .into());
                    }

                    let delay = self.retry_delay(attempt);
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = shutdown.cancelled() => {
                            return Err(ResilienceError::Cancelled.into());
                        }
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::shutdown;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn manager(max_retries: u32, base_ms: u64, max_ms: u64) -> RetryManager {
        RetryManager::new(RetryConfig {
            max_retries,
            base_delay_ms: base_ms,
            max_delay_ms: max_ms,
        })
    }

    #[test]
    fn delay_stays_within_bounds() {
        let m = manager(5, 100, 2_000);
        for attempt in 0..10 {
            let d = m.retry_delay(attempt);
            assert!(d >= Duration::from_millis(100), "attempt {attempt}: {d:?}");
            assert!(d <= Duration::from_millis(2_000), "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn delay_is_monotonically_non_decreasing() {
        // With a ±20% jitter band, the worst case for attempt n+1 still
        // exceeds the best case for attempt n, so order holds per-sample.
        let m = manager(5, 100, 60_000);
        for attempt in 0..5 {
            let lo_next = m.retry_delay(attempt + 1);
            let hi_curr = m.retry_delay(attempt);
            assert!(lo_next >= hi_curr, "attempt {attempt}");
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let m = manager(3, 1, 10);
        let calls = AtomicU32::new(0);
        let result = m
            .execute_with_retry("op", &Shutdown::never(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, Error>(42) }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_names_attempt_count() {
        let m = manager(2, 1, 5);
        let calls = AtomicU32::new(0);
        let err = m
            .execute_with_retry("flaky op", &Shutdown::never(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(Error::Connection("refused".into())) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            Error::Resilience(ResilienceError::RetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn shutdown_aborts_backoff_sleep() {
        let m = manager(5, 10_000, 60_000);
        let (signal, shutdown) = shutdown::channel();
        signal.trigger();

        let err = m
            .execute_with_retry("op", &shutdown, || async {
                Err::<(), _>(Error::Connection("refused".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
