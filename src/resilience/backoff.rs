//! Exponential backoff between retries of a transient strategy failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentialBackoff {
    #[serde(rename = "initial_ms", with = "crate::config::duration_ms")]
    initial: Duration,
    #[serde(rename = "max_ms", with = "crate::config::duration_ms")]
    max: Duration,
    factor: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            initial,
            max,
            factor,
            jitter: 0.1,
        }
    }

    /// Backoff that never waits, for tests and latency-critical callers.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 1.0).with_jitter(0.0)
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Delay before retry number `attempt` (1-based), capped at `max` and
    /// scaled by a uniform factor in `[1 - jitter, 1 + jitter]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let grown_ms = self.initial.as_millis() as f64 * self.factor.max(1.0).powi(exponent);
        let capped_ms = grown_ms.min(self.max.as_millis() as f64);

        let scale = if self.jitter > 0.0 {
            1.0 + self.jitter * (2.0 * rand::random::<f64>() - 1.0)
        } else {
            1.0
        };
        Duration::from_millis((capped_ms * scale).max(0.0).round() as u64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(1),
            factor: 2.0,
            jitter: 0.1,
        }
    }
}
