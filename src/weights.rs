//! Per-query-type scoring weights and confidence thresholds.

use serde::{Deserialize, Serialize};

use crate::classifier::QueryType;

/// Scoring weights passed to weight-aware strategies.
///
/// `knowledge_weight + context_weight + semantic_weight` is 1.0 for every row
/// of the built-in table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub knowledge_weight: f64,
    pub context_weight: f64,
    pub semantic_weight: f64,
    pub confidence_threshold: f64,
}

const SPECIFIC_TOOL: StrategyWeights = StrategyWeights {
    knowledge_weight: 0.50,
    context_weight: 0.20,
    semantic_weight: 0.30,
    confidence_threshold: 0.70,
};

const FUNCTIONAL: StrategyWeights = StrategyWeights {
    knowledge_weight: 0.30,
    context_weight: 0.30,
    semantic_weight: 0.40,
    confidence_threshold: 0.60,
};

const CATEGORY: StrategyWeights = StrategyWeights {
    knowledge_weight: 0.40,
    context_weight: 0.35,
    semantic_weight: 0.25,
    confidence_threshold: 0.55,
};

const GENERAL: StrategyWeights = StrategyWeights {
    knowledge_weight: 0.25,
    context_weight: 0.30,
    semantic_weight: 0.45,
    confidence_threshold: 0.50,
};

/// Fixed weight row for a query type.
pub const fn weights_for(query_type: QueryType) -> StrategyWeights {
    match query_type {
        QueryType::SpecificTool => SPECIFIC_TOOL,
        QueryType::Functional => FUNCTIONAL,
        QueryType::Category => CATEGORY,
        QueryType::General => GENERAL,
    }
}

impl StrategyWeights {
    pub fn total(&self) -> f64 {
        self.knowledge_weight + self.context_weight + self.semantic_weight
    }

    /// Context/semantic split renormalised to sum to 1, for strategies that
    /// have no knowledge signal.
    pub fn lexical_semantic_split(&self) -> (f64, f64) {
        let total = self.context_weight + self.semantic_weight;
        if total <= f64::EPSILON {
            return (0.5, 0.5);
        }
        (self.context_weight / total, self.semantic_weight / total)
    }
}

impl Default for StrategyWeights {
    fn default() -> Self {
        GENERAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        for query_type in QueryType::ALL {
            let w = weights_for(query_type);
            assert!(
                (w.total() - 1.0).abs() <= 0.01,
                "{query_type} sums to {}",
                w.total()
            );
        }
    }

    #[test]
    fn test_thresholds_in_range() {
        for query_type in QueryType::ALL {
            let t = weights_for(query_type).confidence_threshold;
            assert!((0.0..=1.0).contains(&t));
        }
    }

    #[test]
    fn test_functional_threshold() {
        assert_eq!(weights_for(QueryType::Functional).confidence_threshold, 0.60);
    }

    #[test]
    fn test_lexical_semantic_split() {
        let (lexical, semantic) = weights_for(QueryType::Functional).lexical_semantic_split();
        assert!((lexical - 3.0 / 7.0).abs() < 1e-9);
        assert!((lexical + semantic - 1.0).abs() < 1e-9);
    }
}
