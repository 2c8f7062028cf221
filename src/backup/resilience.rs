//! Retry with backoff, bounded by an overall timeout

use std::future::Future;
use std::time::Duration;

use crate::constants::{OPERATION_TIMEOUT_SECS, RETRY_BASE_DELAY_SECS, RETRY_MAX_ATTEMPTS};
use crate::error::{AppError, Result};
use crate::store::StoreError;

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant,
    Linear,
    Exponential,
}

/// Immutable retry/timeout policy for store operations
///
/// Only transient store errors are retried. The timeout covers every attempt
/// and every delay of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResiliencePolicy {
    /// Attempts in total, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
    pub timeout: Duration,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(RETRY_BASE_DELAY_SECS),
            backoff: Backoff::Exponential,
            timeout: Duration::from_secs(OPERATION_TIMEOUT_SECS),
        }
    }
}

impl ResiliencePolicy {
    /// Default policy without any delay between attempts
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay slept before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match self.backoff {
            Backoff::Constant => self.base_delay,
            Backoff::Linear => self.base_delay.saturating_mul(retry),
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or the timeout expires
    ///
    /// `operation` is invoked again on every retry, so it must be safe to repeat.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
    {
        self.execute_with(operation, |_, _| {}).await
    }

    /// Same as [`execute`](Self::execute), calling `on_retry` with the failed
    /// attempt number and the delay before every retry
    pub async fn execute_with<F, Fut, T, R>(&self, operation: F, on_retry: R) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
        R: FnMut(u32, Duration),
    {
        tokio::time::timeout(self.timeout, self.retry(operation, on_retry))
            .await
            .map_err(|_| {
                tracing::warn!("Store operation abandoned after {:?}", self.timeout);
                AppError::Timeout(self.timeout)
            })?
    }

    async fn retry<F, Fut, T, R>(&self, mut operation: F, mut on_retry: R) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, StoreError>>,
        R: FnMut(u32, Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("Store operation succeeded after {} attempts", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e.into()),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!("Store operation failed after {} attempts: {}", attempt, e);
                    return Err(AppError::RetriesExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        "Retry attempt: {} delay: {:?} error: {}",
                        attempt,
                        delay,
                        e
                    );
                    on_retry(attempt, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
