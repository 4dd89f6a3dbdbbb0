//! Result of a search call and the trail of strategy attempts behind it.

use serde::{Deserialize, Serialize};

use crate::catalog::Candidate;
use crate::classifier::QueryType;
use crate::error::ErrorKind;
use crate::strategy::StrategyKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error_kind", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Results returned to the caller.
    Accepted,
    /// Candidates returned but their confidence fell below the threshold.
    Rejected,
    /// The strategy found nothing.
    Empty,
    /// The strategy failed after any retries.
    Failed(ErrorKind),
    /// The search deadline expired during the attempt.
    TimedOut,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Empty => "empty",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Whether the attempt counted against the strategy's circuit breaker.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub strategy: StrategyKind,
    pub status: AttemptStatus,
    pub retries: u32,
    pub duration_ms: u64,
    pub candidate_count: usize,
    /// Aggregate confidence, when the strategy returned candidates.
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Best first, at most `k`, all from `strategy_used`.
    pub candidates: Vec<Candidate>,
    /// `None` when no strategy produced an acceptable result.
    pub strategy_used: Option<StrategyKind>,
    pub query_type: QueryType,
    /// True when the accepted strategy is not first in the chain, or when
    /// nothing was accepted.
    pub fell_back: bool,
    /// Strategies executed, in order.
    pub attempted_strategies: Vec<StrategyKind>,
    /// Strategies passed over because their circuit was open.
    pub skipped_strategies: Vec<StrategyKind>,
    pub attempts: Vec<AttemptRecord>,
    pub aggregate_confidence: Option<f64>,
    pub from_cache: bool,
}

impl SearchOutcome {
    /// Outcome with no candidates and no strategy.
    pub fn empty(query_type: QueryType) -> Self {
        Self {
            candidates: Vec::new(),
            strategy_used: None,
            query_type,
            fell_back: true,
            attempted_strategies: Vec::new(),
            skipped_strategies: Vec::new(),
            attempts: Vec::new(),
            aggregate_confidence: None,
            from_cache: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.strategy_used.is_none()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outcome() {
        let outcome = SearchOutcome::empty(QueryType::General);
        assert!(outcome.is_exhausted());
        assert!(outcome.fell_back);
        assert!(outcome.is_empty());
        assert!(outcome.attempts.is_empty());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(AttemptStatus::Failed(
            ErrorKind::DownstreamFunctionUnavailable,
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "downstream_function_unavailable");

        let json = serde_json::to_value(AttemptStatus::TimedOut).unwrap();
        assert_eq!(json["status"], "timed_out");
    }

    #[test]
    fn test_failure_statuses() {
        assert!(AttemptStatus::TimedOut.is_failure());
        assert!(AttemptStatus::Failed(ErrorKind::QueryParsingFailed).is_failure());
        assert!(!AttemptStatus::Rejected.is_failure());
        assert!(!AttemptStatus::Empty.is_failure());
    }
}
