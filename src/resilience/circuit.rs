//! Per-strategy circuit breakers.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::strategy::StrategyKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    #[serde(rename = "reset_window_ms", with = "crate::config::duration_ms")]
    pub reset_window: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_window: Duration::from_secs(60),
        }
    }
}

/// Observable state of one strategy's circuit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub failure_count: u32,
    pub is_open: bool,
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CircuitState {
    failure_count: u32,
    is_open: bool,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
}

impl CircuitState {
    /// Close an open circuit whose reset window has elapsed.
    fn refresh(&mut self, reset_window: Duration, now: Instant) -> bool {
        if !self.is_open {
            return false;
        }
        let elapsed = self
            .last_failure
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or(Duration::MAX);
        if elapsed >= reset_window {
            self.is_open = false;
            self.failure_count = 0;
            return true;
        }
        false
    }

    fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            failure_count: self.failure_count,
            is_open: self.is_open,
            last_failure_at: self.last_failure_at,
        }
    }
}

/// Registry of circuit breakers keyed by strategy.
///
/// Updates for one strategy are serialised by the map's shard lock, so
/// concurrent searches never lose a failure increment.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: CircuitConfig,
    circuits: DashMap<StrategyKind, CircuitState>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            circuits: DashMap::new(),
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Whether attempts against `strategy` should be skipped.
    ///
    /// An open circuit whose reset window has elapsed is closed here and its
    /// failure count zeroed.
    pub fn is_open(&self, strategy: StrategyKind) -> bool {
        let Some(mut state) = self.circuits.get_mut(&strategy) else {
            return false;
        };
        if state.refresh(self.config.reset_window, Instant::now()) {
            tracing::info!(strategy = %strategy, "Circuit breaker closed after reset window");
        }
        state.is_open
    }

    pub fn record_failure(&self, strategy: StrategyKind) {
        let mut state = self.circuits.entry(strategy).or_default();
        let now = Instant::now();
        state.refresh(self.config.reset_window, now);

        state.failure_count += 1;
        state.last_failure = Some(now);
        state.last_failure_at = Some(Utc::now());

        if !state.is_open && state.failure_count >= self.config.failure_threshold {
            state.is_open = true;
            tracing::warn!(
                strategy = %strategy,
                failures = state.failure_count,
                reset_window_ms = self.config.reset_window.as_millis() as u64,
                "Circuit breaker opened"
            );
        }
    }

    /// Zero the failure count of a closed circuit, so only consecutive
    /// failures trip it.
    pub fn record_success(&self, strategy: StrategyKind) {
        if let Some(mut state) = self.circuits.get_mut(&strategy)
            && !state.is_open
        {
            state.failure_count = 0;
        }
    }

    pub fn reset(&self, strategy: StrategyKind) {
        if self.circuits.remove(&strategy).is_some() {
            tracing::info!(strategy = %strategy, "Circuit breaker reset");
        }
    }

    pub fn reset_all(&self) {
        self.circuits.clear();
    }

    pub fn failure_count(&self, strategy: StrategyKind) -> u32 {
        self.snapshot(strategy).failure_count
    }

    pub fn snapshot(&self, strategy: StrategyKind) -> CircuitSnapshot {
        match self.circuits.get_mut(&strategy) {
            Some(mut state) => {
                state.refresh(self.config.reset_window, Instant::now());
                state.snapshot()
            }
            None => CircuitSnapshot::default(),
        }
    }

    /// Snapshot of every strategy, including ones that never failed.
    ///
    /// Walks `StrategyKind::ALL` rather than the map, so no shard guard is
    /// held while `snapshot` takes its write lock.
    pub fn stats(&self) -> BTreeMap<StrategyKind, CircuitSnapshot> {
        StrategyKind::ALL
            .into_iter()
            .map(|strategy| (strategy, self.snapshot(strategy)))
            .collect()
    }
}
