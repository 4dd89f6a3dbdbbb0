//! Structured spans for search calls and strategy attempts.

use tracing::{Level, Span, field, span};

use crate::strategy::StrategyKind;

/// Root span of one search call.
pub fn search_span(search_id: &str, k: usize) -> Span {
    span!(
        Level::INFO,
        "tool_search.search",
        search_id = %search_id,
        k = k,
        query_type = field::Empty,
        strategy_used = field::Empty,
        fell_back = field::Empty,
        from_cache = field::Empty,
        duration_ms = field::Empty,
    )
}

/// Span around one strategy attempt, retries included.
pub fn attempt_span(strategy: StrategyKind, position: usize) -> Span {
    span!(
        Level::INFO,
        "tool_search.attempt",
        strategy = %strategy,
        position = position,
        status = field::Empty,
        retries = field::Empty,
        candidates = field::Empty,
        confidence = field::Empty,
        duration_ms = field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_accept_recorded_fields() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let search = search_span("abc", 3);
        search.record("query_type", "functional");
        search.record("duration_ms", 12u64);

        let attempt = attempt_span(StrategyKind::Keyword, 0);
        attempt.record("status", "accepted");
        assert!(!attempt.is_disabled());
    }
}
