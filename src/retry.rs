use crate::errors::EnrichmentError;
use std::future::Future;
use std::time::Duration;

/// Attempts used when a policy is built with `max_attempts == 0`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Exponential backoff shared by all provider adapters.
///
/// `max_attempts` counts every attempt, the first one included; 0 means
/// [`DEFAULT_MAX_ATTEMPTS`]. After a failed
/// attempt `n` (0-based) the adapter sleeps `2^n * base_delay` before trying again;
/// the last failure is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 {
                DEFAULT_MAX_ATTEMPTS
            } else {
                max_attempts
            },
            base_delay,
        }
    }

    /// Delay to wait after the given failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    /// Total time spent sleeping if the first `failures` attempts fail.
    pub fn total_delay(&self, failures: u32) -> Duration {
        (0..failures).fold(Duration::ZERO, |acc, attempt| {
            acc.saturating_add(self.delay_for(attempt))
        })
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, EnrichmentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EnrichmentError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 >= self.max_attempts => {
                    tracing::warn!(
                        "{} failed after {} attempt(s): {}",
                        label,
                        attempt + 1,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "{} attempt {} failed ({}), retrying in {:?}",
                        label,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
