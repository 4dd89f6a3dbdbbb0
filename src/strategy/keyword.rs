use std::sync::Arc;

use async_trait::async_trait;

use super::lexical::{self, LexicalIndex};
use super::{SearchStrategy, StrategyKind, StrategyRequest, filter_records};
use crate::Result;
use crate::catalog::{Candidate, ToolRecord, ToolStore, sort_by_score};

/// BM25 keyword search, the last resort of the chain.
///
/// Never fails: a store error yields an empty list, and a query with no BM25
/// match falls back to loose substring matching.
pub struct KeywordStrategy {
    store: Arc<dyn ToolStore>,
}

impl KeywordStrategy {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }

    fn rank(&self, records: &[ToolRecord], scores: &[f64], k: usize) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = records
            .iter()
            .zip(scores)
            .filter(|(_, score)| **score > 0.0)
            .map(|(record, score)| Candidate::from_record(record, *score, self.kind()))
            .collect();
        sort_by_score(&mut candidates);
        candidates.truncate(k);
        candidates
    }
}

#[async_trait]
impl SearchStrategy for KeywordStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Keyword
    }

    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>> {
        let records = match self.store.load_tools().await {
            Ok(records) => filter_records(records, request),
            Err(e) => {
                tracing::warn!(store = self.store.name(), error = %e, "Keyword search degraded to empty result");
                return Ok(Vec::new());
            }
        };

        let bm25 = LexicalIndex::build(&records).scores(&request.query);
        let candidates = self.rank(&records, &bm25, request.k);
        if !candidates.is_empty() {
            return Ok(candidates);
        }

        let loose = lexical::loose_scores(&records, &request.query);
        Ok(self.rank(&records, &loose, request.k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchError;
    use crate::catalog::{BudgetTier, InMemoryToolStore, PreferenceFilter};
    use crate::strategy::test_support::catalog;

    struct BrokenStore;

    #[async_trait]
    impl ToolStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }

        async fn load_tools(&self) -> Result<Vec<ToolRecord>> {
            Err(SearchError::unavailable("tool_store", "connection refused"))
        }
    }

    fn strategy() -> KeywordStrategy {
        KeywordStrategy::new(Arc::new(InMemoryToolStore::from_records(catalog())))
    }

    #[tokio::test]
    async fn test_bm25_match() {
        let candidates = strategy()
            .execute(&StrategyRequest::new("issue tracking", 5))
            .await
            .unwrap();
        // "tracking" also matches Mixpanel, but only Linear matches both terms.
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "linear");
        assert_eq!(candidates[0].strategy_used, StrategyKind::Keyword);
    }

    #[tokio::test]
    async fn test_falls_back_to_substring() {
        let candidates = strategy()
            .execute(&StrategyRequest::new("prototyp", 5))
            .await
            .unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"figma") && ids.contains(&"penpot"));
    }

    #[tokio::test]
    async fn test_store_error_is_empty() {
        let strategy = KeywordStrategy::new(Arc::new(BrokenStore));
        let candidates = strategy
            .execute(&StrategyRequest::new("anything", 5))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_applies_preferences() {
        let request = StrategyRequest::new("ui mockups dashboards", 5)
            .with_preferences(PreferenceFilter::new().budget(BudgetTier::Free));
        let candidates = strategy().execute(&request).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "penpot");
    }
}
