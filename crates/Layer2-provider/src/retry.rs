//! Retry for idempotent auxiliary calls (credits, download links)
//!
//! Status checks never go through here; the poller schedules those itself.
//! A throttled response that names its own `Retry-After` is honored, capped
//! at `max_delay`.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first call
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Uniform extra delay in `[0, jitter_ms]`, skipped for server-provided delays
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_ms: 250,
        }
    }
}

impl RetryConfig {
    /// `min(base * 2^retry, max)`, without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay_for(&self, retry: u32, decision: RetryDecision) -> Duration {
        if let RetryDecision::Throttled {
            retry_after: Some(after),
        } = decision
        {
            return after.min(self.max_delay);
        }
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        self.backoff(retry) + Duration::from_millis(jitter)
    }
}

/// What a failed call allows the caller to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Permanent,
    Transient,
    /// Rate limited; the service may say how long to wait
    Throttled { retry_after: Option<Duration> },
}

pub trait RetryableError {
    fn retry_decision(&self) -> RetryDecision;
}

/// Run `operation` until it succeeds, fails permanently, or retries run out
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut retry = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let decision = err.retry_decision();
        if decision == RetryDecision::Permanent {
            debug!(operation = operation_name, "Permanent failure: {}", err);
            return Err(err);
        }
        if retry >= config.max_retries {
            warn!(operation = operation_name, retries = retry, "Giving up: {}", err);
            return Err(err);
        }

        let delay = config.delay_for(retry, decision);
        retry += 1;
        warn!(
            operation = operation_name,
            retry,
            delay_ms = delay.as_millis() as u64,
            "Call failed, retrying: {}",
            err
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Failure(RetryDecision);

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl RetryableError for Failure {
        fn retry_decision(&self) -> RetryDecision {
            self.0
        }
    }

    fn quick() -> RetryConfig {
        RetryConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0), Duration::from_secs(1));
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(4), Duration::from_secs(16));
        assert_eq!(config.backoff(5), Duration::from_secs(30));
        assert_eq!(config.backoff(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_is_additive() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let delay = config.delay_for(0, RetryDecision::Transient).as_millis();
            assert!((1000..=1250).contains(&delay), "delay {} out of band", delay);
        }
    }

    #[test]
    fn test_server_delay_is_capped() {
        let config = RetryConfig::default();
        let throttled = |secs| RetryDecision::Throttled {
            retry_after: Some(Duration::from_secs(secs)),
        };
        assert_eq!(config.delay_for(0, throttled(5)), Duration::from_secs(5));
        assert_eq!(config.delay_for(0, throttled(300)), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, Failure> = with_retry(&quick(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Failure(RetryDecision::Transient))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Failure> = with_retry(&quick(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Failure(RetryDecision::Permanent)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), Failure> = with_retry(&quick(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Failure(RetryDecision::Transient)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_retry_after() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), Failure> = with_retry(&RetryConfig::default(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Failure(RetryDecision::Throttled {
                        retry_after: Some(Duration::from_secs(7)),
                    }))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }
}
