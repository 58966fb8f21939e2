//! Bounded retry with exponential backoff for transient transfer failures.

use crate::transfer::TransferError;
use log::warn;
use std::time::Duration;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry; doubled for each later retry.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// How many times, and how patiently, to retry a transfer.
///
/// # Examples
///
/// ```
/// use repo_trust::retry::RetryPolicy;
/// use repo_trust::transfer::TransferError;
///
/// let policy = RetryPolicy::immediate(3);
/// let mut calls = 0;
/// let result: Result<u32, TransferError> = policy.run("probe", || {
///     calls += 1;
///     if calls < 3 {
///         Err(TransferError::RateLimited { url: "https://api.example.test".to_owned() })
///     } else {
///         Ok(calls)
///     }
/// });
/// assert_eq!(result.unwrap(), 3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    sleep: fn(Duration),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            sleep: std::thread::sleep,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            sleep: |_| {},
        }
    }

    /// A policy that performs exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    /// Maximum number of attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (zero-based).
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(retry))
    }

    /// Run `operation` until it succeeds, fails fatally, or attempts run out.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last retryable error
    /// once all attempts are spent.
    pub fn run<T, F>(&self, label: &str, mut operation: F) -> Result<T, TransferError>
    where
        F: FnMut() -> Result<T, TransferError>,
    {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt - 1);
                    warn!(
                        "{label} failed (attempt {attempt}/{}): {err}; retrying in {}ms",
                        self.max_attempts,
                        delay.as_millis()
                    );
                    (self.sleep)(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
