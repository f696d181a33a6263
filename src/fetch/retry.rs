use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::FetchError;

/// How long to wait before the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `step * attempt`, so 2s, 4s, ... for a 2s step
    Linear(Duration),
    Fixed(Duration),
    None,
}

impl Backoff {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Linear(step) => step.saturating_mul(attempt),
            Backoff::Fixed(delay) => *delay,
            Backoff::None => Duration::ZERO,
        }
    }
}

/// Retry policy shared by every remote source
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retryable: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Backoff::Linear(Duration::from_secs(2)),
            retryable: FetchError::is_transient,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
            ..Default::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent. The closure receives the 1-based
    /// attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt <= self.max_retries && (self.retryable)(&err) => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        "⏳ {} failed (attempt {}/{}): {} - retrying in {:?}",
                        label,
                        attempt,
                        self.max_attempts(),
                        err,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
