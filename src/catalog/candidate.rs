//! Scored search candidates.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::ToolRecord;
use crate::strategy::StrategyKind;

/// A scored tool produced by one strategy for one search call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub logo_url: Option<String>,
    pub categories: BTreeSet<String>,
    pub score: f64,
    pub strategy_used: StrategyKind,
    /// Per-candidate confidence in `[0, 1]`; `None` for strategies without a
    /// confidence signal.
    pub confidence_score: Option<f64>,
    pub reasoning: Option<String>,
}

impl Candidate {
    pub fn from_record(record: &ToolRecord, score: f64, strategy: StrategyKind) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            url: record.url.clone(),
            logo_url: record.logo_url.clone(),
            categories: record.categories.clone(),
            score,
            strategy_used: strategy,
            confidence_score: None,
            reasoning: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Sort by descending score, ties broken by id for deterministic output.
pub(crate) fn sort_by_score(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
