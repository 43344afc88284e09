use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Delay waited after the first failed attempt
    pub initial_delay: Duration,
    /// Cap on the growing delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
    /// Rate-limited attempts wait `delay * rate_limit_factor` instead of `delay`
    pub rate_limit_factor: u32,
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            rate_limit_factor: 2,
        }
    }

    /// Set the maximum delay between retries
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set how much longer a rate-limited attempt waits
    pub fn with_rate_limit_factor(mut self, factor: u32) -> Self {
        self.rate_limit_factor = factor;
        self
    }

    /// Preset: provider calls (3 attempts)
    /// Waits: 1s, 2s (2s, 4s when rate limited)
    pub fn api_call() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    /// How long to wait after a failure when the current backoff delay is `delay`.
    pub fn wait_after_failure(&self, delay: Duration, rate_limited: bool) -> Duration {
        if rate_limited {
            delay.saturating_mul(self.rate_limit_factor)
        } else {
            delay
        }
    }

    /// Grow the backoff delay for the next attempt, capped at `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let grown = delay.as_millis() as f64 * self.backoff_multiplier;
        let capped = grown.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::api_call()
    }
}

/// Execute an async operation with exponential backoff
///
/// After each failed attempt (except the last) the loop sleeps for the current
/// delay, or for the delay times `rate_limit_factor` when `is_rate_limit`
/// classifies the error as a rate limit, and then grows the delay. Both kinds
/// of failure share the same delay growth.
///
/// # Arguments
/// * `config` - Retry configuration; `max_attempts` of 0 is treated as 1
/// * `operation_name` - Name of the operation for logging
/// * `operation` - Async closure that returns Result<T, E>
/// * `is_rate_limit` - Classifies errors that should wait longer
///
/// # Returns
/// The result of the operation, or the last error if all attempts failed
pub async fn with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    is_rate_limit: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        "{}: Succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= max_attempts {
                    warn!(
                        "{}: All {} attempts failed. Last error: {}",
                        operation_name, max_attempts, e
                    );
                    return Err(e);
                }

                let wait = config.wait_after_failure(delay, is_rate_limit(&e));
                warn!(
                    "{}: Attempt {}/{} failed ({}), retrying in {:?}",
                    operation_name, attempt, max_attempts, e, wait
                );
                sleep(wait).await;

                delay = config.next_delay(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn never(_: &&str) -> bool {
        false
    }

    /// Paused-clock timers fire at millisecond granularity, so allow a tick of slack.
    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.rate_limit_factor, 2);
    }

    #[test]
    fn test_next_delay_doubles() {
        let config = RetryConfig::new(4, Duration::from_secs(1));
        assert_eq!(
            config.next_delay(Duration::from_secs(1)),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.next_delay(Duration::from_secs(2)),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn test_next_delay_respects_max() {
        let config = RetryConfig::new(10, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(
            config.next_delay(Duration::from_secs(2)),
            Duration::from_secs(3)
        );
        assert_eq!(
            config.next_delay(Duration::from_secs(3)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_rate_limited_wait_is_doubled() {
        let config = RetryConfig::api_call();
        let delay = Duration::from_millis(500);

        assert_eq!(config.wait_after_failure(delay, false), delay);
        assert_eq!(
            config.wait_after_failure(delay, true),
            Duration::from_secs(1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_attempt() {
        let config = RetryConfig::new(3, Duration::from_secs(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let start = Instant::now();
        let result: Result<u32, &str> = with_backoff(
            &config,
            "test",
            || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            },
            never,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_close(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_failures_with_growing_waits() {
        let config = RetryConfig::new(3, Duration::from_secs(1));
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let attempts_clone = attempts.clone();

        let result: Result<&str, &str> = with_backoff(
            &config,
            "test",
            || {
                let attempts = attempts_clone.clone();
                async move {
                    let mut attempts = attempts.lock().unwrap();
                    attempts.push(Instant::now());
                    if attempts.len() < 3 {
                        Err("temporary failure")
                    } else {
                        Ok("translated")
                    }
                }
            },
            never,
        )
        .await;

        assert_eq!(result.unwrap(), "translated");
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);

        let first_wait = attempts[1] - attempts[0];
        let second_wait = attempts[2] - attempts[1];
        assert_close(first_wait, Duration::from_secs(1));
        assert_close(second_wait, Duration::from_secs(2));
        assert!(second_wait >= first_wait);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_fail_returns_last_error() {
        let config = RetryConfig::new(3, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), String> = with_backoff(
            &config,
            "error_test",
            || {
                let c = counter_clone.clone();
                async move {
                    let attempt = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("error on attempt {}", attempt + 1))
                }
            },
            |_: &String| false,
        )
        .await;

        assert_eq!(result.unwrap_err(), "error on attempt 3");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_final_attempt() {
        let config = RetryConfig::new(2, Duration::from_secs(1));

        let start = Instant::now();
        let result: Result<(), &str> =
            with_backoff(&config, "final", || async { Err("nope") }, never).await;

        assert!(result.is_err());
        // One wait between attempt 1 and 2, nothing after attempt 2
        assert_close(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_twice_as_long() {
        let config = RetryConfig::new(3, Duration::from_secs(1));

        let start = Instant::now();
        let result: Result<(), &str> = with_backoff(
            &config,
            "rate_limited",
            || async { Err("429") },
            |e: &&str| *e == "429",
        )
        .await;

        assert!(result.is_err());
        // 2s (1s doubled) + 4s (2s doubled)
        assert_close(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_errors_share_delay_growth() {
        let config = RetryConfig::new(3, Duration::from_secs(1));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let start = Instant::now();
        let result: Result<(), &str> = with_backoff(
            &config,
            "mixed",
            || {
                let c = counter_clone.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("429")
                    } else {
                        Err("500")
                    }
                }
            },
            |e: &&str| *e == "429",
        )
        .await;

        assert!(result.is_err());
        // 2s after the rate limit, then the grown 2s delay for the plain failure
        assert_close(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let config = RetryConfig::new(4, Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(2));

        let start = Instant::now();
        let _result: Result<(), &str> =
            with_backoff(&config, "capped", || async { Err("down") }, never).await;

        // 1s + 2s + 2s (capped)
        assert_close(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig::new(0, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), &str> = with_backoff(
            &config,
            "zero",
            || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("failure")
                }
            },
            never,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
