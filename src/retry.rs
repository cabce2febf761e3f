//! Bounded retry and inter-transaction pacing.
//!
//! Both use a flat uniform-random interval - no exponential backoff. The
//! delays exist to ride out transient RPC failures and to stay under
//! anti-bot rate limits, not to implement congestion control.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay(&self) -> Duration {
        random_duration(self.min_delay, self.max_delay)
    }
}

fn random_duration(min: Duration, max: Duration) -> Duration {
    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    if max_ms <= min_ms {
        return min;
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Run `op` up to `policy.attempts` times, sleeping a randomized interval
/// between attempts. The closure receives the 1-based attempt number. The
/// final attempt's failure propagates unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts => {
                warn!("attempt {attempt}/{} failed: {e}", policy.attempts);
                sleep(policy.delay()).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Suspend for a random duration in `[min, max]` between successive
/// transactions.
pub async fn pace(min: Duration, max: Duration) {
    let wait = random_duration(min, max);
    debug!("waiting {}s before next transaction", wait.as_secs());
    sleep(wait).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_success_passes_through_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(fast_policy(), |_| {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_fail_twice_then_succeed() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(fast_policy(), |attempt| {
            calls.fetch_add(1, Ordering::Relaxed);
            async move {
                if attempt < 3 {
                    Err(format!("transient failure {attempt}"))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_final_failure_propagates_after_exactly_three_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(fast_policy(), |_| {
            calls.fetch_add(1, Ordering::Relaxed);
            async { Err("permanent failure".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "permanent failure");
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_pace_sleeps_within_bounds() {
        let start = std::time::Instant::now();
        pace(Duration::from_millis(5), Duration::from_millis(20)).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_random_duration_degenerate_range() {
        let d = Duration::from_millis(5);
        assert_eq!(random_duration(d, d), d);
        assert_eq!(random_duration(d, Duration::from_millis(1)), d);
    }
}
