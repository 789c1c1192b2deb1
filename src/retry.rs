//! Retry policy for backend control calls
//!
//! Metadata resolution and session handshakes may be retried; chunk
//! fetches never are, because by the time one fails the response headers
//! are already on the wire.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::{RelayError, Result};

/// Upper bound on any single retry delay, even when the backend asks
/// for more
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry policy for failed control calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: usize,
    /// Backoff durations in milliseconds between attempts
    pub backoff_ms: Vec<u64>,
    /// Cap applied to every delay, including backend-advertised ones
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy with exponential backoff
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts allowed, including the first
    /// * `base_ms` - First backoff in milliseconds; each retry doubles it.
    ///   A base of 0 retries immediately, which is what the session
    ///   handshake wants.
    pub fn new(max_attempts: usize, base_ms: u64) -> Self {
        let backoff_ms = (0..max_attempts.saturating_sub(1))
            .map(|i| base_ms * 2u64.pow(i as u32))
            .collect();

        RetryPolicy {
            max_attempts,
            backoff_ms,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Replace the delay cap
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Check if we should retry after `attempts` completed attempts
    pub fn should_retry(&self, attempts: usize, error: &RelayError) -> bool {
        attempts < self.max_attempts && error.should_retry()
    }

    /// Delay before the next attempt
    ///
    /// A backend-advertised delay (rate limits carry one) wins over the
    /// configured backoff; either way the result is capped at `max_delay`.
    pub fn backoff_duration(&self, attempt: usize, error: &RelayError) -> Duration {
        let configured = self
            .backoff_ms
            .get(attempt)
            .copied()
            .map(Duration::from_millis)
            .unwrap_or(self.max_delay);
        error.retry_after().unwrap_or(configured).min(self.max_delay)
    }

    /// Drive `op` until it succeeds, the error is permanent, or the
    /// attempt budget runs out. The last error is returned unchanged so
    /// callers keep its HTTP status mapping.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !self.should_retry(attempts, &e) {
                        return Err(e);
                    }

                    let backoff = self.backoff_duration(attempts - 1, &e);
                    warn!(
                        "{} failed (attempt {}/{}), retrying after {:?}: {}",
                        what, attempts, self.max_attempts, backoff, e
                    );
                    sleep(backoff).await;
                }
            }
        }
    }
}
