//! Retrieval strategies.
//!
//! Each strategy turns a [`StrategyRequest`] into a ranked candidate list.
//! The engine tries them in chain order; see [`StrategyKind::DEFAULT_CHAIN`].

mod adaptive;
mod hybrid;
mod keyword;
mod knowledge;
mod lexical;
mod signals;
mod vector;

pub use adaptive::AdaptiveStrategy;
pub use hybrid::HybridStrategy;
pub use keyword::KeywordStrategy;
pub use knowledge::KnowledgeEnhancedStrategy;
pub use vector::VectorStrategy;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::catalog::{Candidate, PreferenceFilter, ToolRecord, ToolStore};
use crate::classifier::{self, QueryType};
use crate::embedding::QueryEmbedding;
use crate::weights::{self, StrategyWeights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    KnowledgeEnhanced,
    Adaptive,
    Hybrid,
    Vector,
    Keyword,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::KnowledgeEnhanced,
        StrategyKind::Adaptive,
        StrategyKind::Hybrid,
        StrategyKind::Vector,
        StrategyKind::Keyword,
    ];

    /// Most expressive strategy first, plain keyword matching last.
    pub const DEFAULT_CHAIN: [StrategyKind; 5] = Self::ALL;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeEnhanced => "knowledge-enhanced",
            Self::Adaptive => "adaptive",
            Self::Hybrid => "hybrid",
            Self::Vector => "vector",
            Self::Keyword => "keyword",
        }
    }

    /// Results from gated strategies are accepted only when their aggregate
    /// confidence meets the query type's threshold. Other strategies are
    /// accepted whenever they return at least one candidate.
    pub fn is_confidence_gated(&self) -> bool {
        matches!(self, Self::KnowledgeEnhanced | Self::Adaptive)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Inputs shared by every strategy attempt of one search call.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    pub query: String,
    pub k: usize,
    pub query_type: QueryType,
    pub weights: StrategyWeights,
    pub preferences: PreferenceFilter,
    pub embedding: QueryEmbedding,
}

impl StrategyRequest {
    /// Request with the query classified and weighted, no preferences and no
    /// embedding generator.
    pub fn new(query: impl Into<String>, k: usize) -> Self {
        let query = query.into();
        let query_type = classifier::classify(&query);
        Self {
            query,
            k,
            query_type,
            weights: weights::weights_for(query_type),
            preferences: PreferenceFilter::default(),
            embedding: QueryEmbedding::unavailable(),
        }
    }

    pub fn with_preferences(mut self, preferences: PreferenceFilter) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_embedding(mut self, embedding: QueryEmbedding) -> Self {
        self.embedding = embedding;
        self
    }
}

#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Produce at most `request.k` candidates, best first.
    ///
    /// An empty list means "nothing relevant"; errors are classified by
    /// [`crate::SearchError::category`] for retry and circuit-breaker
    /// decisions.
    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>>;
}

/// The five built-in strategies over one store, in default chain order.
pub fn default_strategies(store: Arc<dyn ToolStore>) -> Vec<Arc<dyn SearchStrategy>> {
    vec![
        Arc::new(KnowledgeEnhancedStrategy::new(store.clone())),
        Arc::new(AdaptiveStrategy::new(store.clone())),
        Arc::new(HybridStrategy::new(store.clone())),
        Arc::new(VectorStrategy::new(store.clone())),
        Arc::new(KeywordStrategy::new(store)),
    ]
}

/// Records matching the request's preference filter.
pub(crate) fn filter_records(records: Vec<ToolRecord>, request: &StrategyRequest) -> Vec<ToolRecord> {
    if request.preferences.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| request.preferences.matches(r))
        .collect()
}
