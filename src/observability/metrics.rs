//! Atomic search metrics.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Signed gauge for in-flight work.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment now and decrement when the returned guard drops, including
    /// when the owning future is cancelled.
    pub fn track(&self) -> GaugeGuard<'_> {
        self.value.fetch_add(1, Ordering::Relaxed);
        GaugeGuard(self)
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

pub struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.value.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Search latency bucket upper bounds in milliseconds. Slower calls land in
/// a final unbounded bucket.
pub const LATENCY_BOUNDS_MS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Debug)]
pub struct LatencyHistogram {
    bounds_ms: Vec<u64>,
    buckets: Vec<AtomicU64>,
    total_micros: AtomicU64,
    count: AtomicU64,
}

impl LatencyHistogram {
    /// `bounds_ms` must be ascending.
    pub fn with_bounds(bounds_ms: impl Into<Vec<u64>>) -> Self {
        let bounds_ms = bounds_ms.into();
        let buckets = std::iter::repeat_with(|| AtomicU64::new(0))
            .take(bounds_ms.len() + 1)
            .collect();
        Self {
            bounds_ms,
            buckets,
            total_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn record(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let slot = self
            .bounds_ms
            .partition_point(|bound| bound.saturating_mul(1000) < micros);
        self.buckets[slot].fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_ms(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.total_micros.load(Ordering::Relaxed) as f64 / 1000.0 / n as f64,
        }
    }

    /// Observations per bucket, the unbounded bucket last.
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::with_bounds(LATENCY_BOUNDS_MS)
    }
}

#[derive(Debug, Default)]
pub struct StrategyCounters {
    pub attempts: Counter,
    pub accepted: Counter,
    pub failures: Counter,
    pub rejections: Counter,
    pub skips: Counter,
    pub retries: Counter,
}

/// Counters maintained by the search engine.
#[derive(Debug)]
pub struct SearchMetrics {
    pub searches: Counter,
    pub cache_hits: Counter,
    pub fallbacks: Counter,
    pub exhausted: Counter,
    pub cancelled: Counter,
    pub active_searches: Gauge,
    pub latency: LatencyHistogram,
    strategies: BTreeMap<StrategyKind, StrategyCounters>,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self {
            searches: Counter::new(),
            cache_hits: Counter::new(),
            fallbacks: Counter::new(),
            exhausted: Counter::new(),
            cancelled: Counter::new(),
            active_searches: Gauge::new(),
            latency: LatencyHistogram::default(),
            strategies: StrategyKind::ALL
                .into_iter()
                .map(|kind| (kind, StrategyCounters::default()))
                .collect(),
        }
    }

    pub fn strategy(&self, kind: StrategyKind) -> &StrategyCounters {
        // Every kind is inserted at construction.
        &self.strategies[&kind]
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            searches: self.searches.get(),
            cache_hits: self.cache_hits.get(),
            fallbacks: self.fallbacks.get(),
            exhausted: self.exhausted.get(),
            cancelled: self.cancelled.get(),
            active_searches: self.active_searches.get(),
            avg_latency_ms: self.latency.mean_ms(),
            strategies: self
                .strategies
                .iter()
                .map(|(kind, c)| {
                    (
                        *kind,
                        StrategySummary {
                            attempts: c.attempts.get(),
                            accepted: c.accepted.get(),
                            failures: c.failures.get(),
                            rejections: c.rejections.get(),
                            skips: c.skips.get(),
                            retries: c.retries.get(),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub attempts: u64,
    pub accepted: u64,
    pub failures: u64,
    pub rejections: u64,
    pub skips: u64,
    pub retries: u64,
}

/// Point-in-time snapshot of [`SearchMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub searches: u64,
    pub cache_hits: u64,
    pub fallbacks: u64,
    pub exhausted: u64,
    pub cancelled: u64,
    pub active_searches: i64,
    pub avg_latency_ms: f64,
    pub strategies: BTreeMap<StrategyKind, StrategySummary>,
}

impl MetricsSummary {
    pub fn cache_hit_rate(&self) -> f64 {
        if self.searches == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.searches as f64
        }
    }
}
