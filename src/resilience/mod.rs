//! Resilience layer for strategy execution.
//!
//! Provides bounded retry with exponential backoff and per-strategy circuit
//! breakers.

mod backoff;
mod circuit;

pub use backoff::ExponentialBackoff;
pub use circuit::{CircuitBreakerRegistry, CircuitConfig, CircuitSnapshot};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub backoff: ExponentialBackoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: ExponentialBackoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run `operation`, retrying transient errors up to `max_retries` times.
    ///
    /// Structural and other non-retryable errors return immediately. The
    /// number of retries performed is written to `retries` as they happen, so
    /// it stays accurate when the caller drops this future on a deadline.
    pub async fn execute<F, Fut, T>(&self, retries: &mut u32, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || *retries >= self.max_retries {
                        return Err(e);
                    }

                    *retries += 1;
                    let delay = self.backoff.delay_for(*retries);
                    tracing::debug!(
                        retry = *retries,
                        error_kind = %e.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "Retrying transient strategy failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::SearchError;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result = RetryConfig::default()
            .execute(&mut retries, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SearchError::embedding("hash", "flaky"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result: Result<()> = RetryConfig::default()
            .execute(&mut retries, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::TimeoutExceeded(Duration::from_millis(10)))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_structural_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let mut retries = 0;

        let result: Result<()> = RetryConfig::default()
            .execute(&mut retries, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SearchError::unavailable("vector_index", "missing"))
            })
            .await;

        assert!(result.unwrap_err().is_structural());
        assert_eq!(retries, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
