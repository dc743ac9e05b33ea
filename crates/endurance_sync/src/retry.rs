use rand::{RngExt, rng};
use std::fmt::Display;
use std::time::Duration;

/// Retry policy with exponential backoff and jitter. `max_attempts: None`
/// keeps retrying until the operation succeeds or the process is stopped.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy from a CLI attempt count, where 0 means unlimited.
    pub fn from_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: (attempts > 0).then_some(attempts),
            ..Self::default()
        }
    }

    /// Backoff before the attempt following failure number `failures`.
    fn delay_for(&self, failures: u32) -> Duration {
        let factor = 1u32 << failures.saturating_sub(1).min(16);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let half = capped.as_millis() as u64 / 2;
        let mut rng = rng();
        let jitter = rng.random_range(0..=half);
        Duration::from_millis(half + jitter)
    }

    pub async fn retry_async<F, Fut, T, E>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut failures = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    failures += 1;
                    if let Some(max) = self.max_attempts {
                        if failures >= max {
                            tracing::error!(attempts = failures, error = %e, "giving up");
                            return Err(e);
                        }
                    }
                    let delay = self.delay_for(failures);
                    tracing::warn!(
                        attempt = failures,
                        error = %e,
                        "attempt failed, retrying in {:.1}s",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = fast(None)
            .retry_async(move || {
                let c = c.clone();
                async move {
                    let prev = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if prev < 3 { Err("fail") } else { Ok(42) }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn bounded_policy_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = fast(Some(2))
            .retry_async(move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("failure {n}"))
                }
            })
            .await;
        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn from_attempts_zero_is_unbounded() {
        assert_eq!(RetryPolicy::from_attempts(0).max_attempts, None);
        assert_eq!(RetryPolicy::from_attempts(3).max_attempts, Some(3));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        };
        for failures in [1, 5, 40] {
            let d = policy.delay_for(failures);
            assert!(d <= Duration::from_secs(8), "{d:?}");
        }
        assert!(policy.delay_for(1) >= Duration::from_millis(500));
    }
}
