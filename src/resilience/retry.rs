//! Retry policy for S3 requests.

use crate::config::MultipartConfig;
use crate::error::S3Error;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Add jitter to backoff.
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Retry settings of a [`MultipartConfig`].
    pub fn from_config(config: &MultipartConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            backoff_multiplier: config.backoff_multiplier,
            use_jitter: true,
        }
    }

    /// Set the initial backoff duration.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Create a no-retry configuration.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Retry policy that executes operations with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation with retry logic.
    ///
    /// Only errors for which [`S3Error::is_retryable`] holds are retried. A
    /// server-provided retry delay takes precedence over the computed backoff.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, S3Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, S3Error>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt = attempt, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.config.max_retries {
                        if attempt > 0 {
                            warn!(
                                attempt = attempt,
                                max_retries = self.config.max_retries,
                                error = %error,
                                "Operation failed after all retries"
                            );
                        }
                        return Err(error);
                    }

                    let backoff = error
                        .retry_after()
                        .unwrap_or_else(|| self.calculate_backoff(attempt));
                    debug!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Retrying operation after backoff"
                    );

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Calculate backoff duration for a given attempt.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.as_millis() as f64;
        let multiplied = base * self.config.backoff_multiplier.powi(attempt as i32);
        let capped = multiplied.min(self.config.max_backoff.as_millis() as f64);

        let final_ms = if self.config.use_jitter {
            // Between half and all of the capped delay.
            capped * (0.5 + rand_jitter(capped) * 0.5)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

/// Pseudo-random value in `[0.0, 1.0)` from the system clock.
fn rand_jitter(seed: f64) -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let combined = (nanos as f64 * seed) % 1000.0;
    combined / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, ServerError, TargetError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::new(max_retries)
                .with_initial_backoff(Duration::from_millis(1))
                .with_jitter(false),
        )
    }

    #[test]
    fn test_from_config() {
        let config = MultipartConfig::builder()
            .max_retries(7)
            .initial_backoff(Duration::from_millis(20))
            .build()
            .unwrap();
        let retry = RetryConfig::from_config(&config);
        assert_eq!(retry.max_retries, 7);
        assert_eq!(retry.initial_backoff, Duration::from_millis(20));
    }

    #[test]
    fn test_backoff_calculation() {
        let config = RetryConfig::new(3)
            .with_initial_backoff(Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_jitter(false);
        let policy = RetryPolicy::new(config);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig::new(10)
            .with_initial_backoff(Duration::from_secs(1))
            .with_max_backoff(Duration::from_secs(5))
            .with_multiplier(10.0)
            .with_jitter(false);
        let policy = RetryPolicy::new(config);

        assert_eq!(policy.calculate_backoff(5), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy =
            RetryPolicy::new(RetryConfig::new(3).with_initial_backoff(Duration::from_millis(100)));
        let backoff = policy.calculate_backoff(0);
        assert!(backoff >= Duration::from_millis(50));
        assert!(backoff <= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_retry_then_succeed() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = fast(3)
            .execute(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(S3Error::Network(NetworkError::ConnectionReset))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_non_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), S3Error> = fast(3)
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(S3Error::Target(TargetError::NoSuchBucket {
                        bucket: "b".into(),
                        request_id: None,
                    }))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), S3Error> = fast(2)
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(S3Error::Server(ServerError::SlowDown {
                        retry_after: Some(Duration::from_millis(1)),
                        request_id: None,
                    }))
                }
            })
            .await;

        assert!(matches!(result, Err(S3Error::Server(ServerError::SlowDown { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
