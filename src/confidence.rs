//! Aggregate confidence of a result set and threshold acceptance.

use crate::catalog::Candidate;

/// Confidence assumed for candidates whose strategy emitted none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Mean confidence over `candidates`, clamped to `[0, 1]`.
///
/// Candidates without a score count as [`DEFAULT_CONFIDENCE`]; an empty set
/// has confidence `0.0`.
pub fn aggregate(candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    let total: f64 = candidates
        .iter()
        .map(|c| c.confidence_score.unwrap_or(DEFAULT_CONFIDENCE))
        .sum();
    (total / candidates.len() as f64).clamp(0.0, 1.0)
}

pub fn accept(aggregate: f64, threshold: f64) -> bool {
    aggregate >= threshold
}
