//! Metrics and tracing spans for the search engine.

mod metrics;
mod spans;

pub use metrics::{
    Counter, Gauge, GaugeGuard, LATENCY_BOUNDS_MS, LatencyHistogram, MetricsSummary, SearchMetrics,
    StrategyCounters, StrategySummary,
};
pub use spans::{attempt_span, search_span};
