use std::sync::Arc;

use async_trait::async_trait;

use super::signals::{self, MIN_RELEVANCE};
use super::{SearchStrategy, StrategyKind, StrategyRequest};
use crate::Result;
use crate::catalog::{Candidate, ToolStore, sort_by_score};

/// Blends knowledge, context and semantic signals with the query type's
/// weights. Each candidate's confidence is its blended score.
pub struct KnowledgeEnhancedStrategy {
    store: Arc<dyn ToolStore>,
}

impl KnowledgeEnhancedStrategy {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchStrategy for KnowledgeEnhancedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KnowledgeEnhanced
    }

    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>> {
        let scored = signals::score_catalog(self.store.as_ref(), request, true).await?;
        let w = request.weights;

        let mut candidates: Vec<Candidate> = scored
            .records
            .iter()
            .zip(&scored.signals)
            .filter_map(|(record, s)| {
                let score = s.blend(w.knowledge_weight, w.context_weight, w.semantic_weight);
                (score >= MIN_RELEVANCE).then(|| {
                    Candidate::from_record(record, score, self.kind())
                        .with_confidence(score)
                        .with_reasoning(format!(
                            "{} query: knowledge {:.2}, context {:.2}, semantic {:.2}",
                            request.query_type, s.knowledge, s.context, s.semantic
                        ))
                })
            })
            .collect();

        sort_by_score(&mut candidates);
        candidates.truncate(request.k);
        Ok(candidates)
    }
}
