use std::sync::Arc;

use async_trait::async_trait;

use super::signals::{self, MIN_RELEVANCE, Signals};
use super::{SearchStrategy, StrategyKind, StrategyRequest};
use crate::Result;
use crate::catalog::{Candidate, ToolStore, sort_by_score};

/// A signal whose best value across the catalog stays below this carries no
/// information for the query.
const INFORMATIVE_FLOOR: f64 = 0.05;

/// Agreement assumed when only one signal is informative.
const NEUTRAL_AGREEMENT: f64 = 0.5;

/// Like the knowledge-enhanced strategy, but drops uninformative signals and
/// renormalises the remaining weights before blending. Confidence mixes the
/// blended score with how closely the informative signals agree.
pub struct AdaptiveStrategy {
    store: Arc<dyn ToolStore>,
}

impl AdaptiveStrategy {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EffectiveWeights {
    knowledge: f64,
    context: f64,
    semantic: f64,
}

impl EffectiveWeights {
    fn active(&self) -> usize {
        [self.knowledge, self.context, self.semantic]
            .iter()
            .filter(|w| **w > 0.0)
            .count()
    }

    fn agreement(&self, s: &Signals) -> f64 {
        let values: Vec<f64> = [
            (self.knowledge, s.knowledge),
            (self.context, s.context),
            (self.semantic, s.semantic),
        ]
        .into_iter()
        .filter(|(w, _)| *w > 0.0)
        .map(|(_, v)| v)
        .collect();

        if values.len() < 2 {
            return NEUTRAL_AGREEMENT;
        }
        let max = values.iter().copied().fold(f64::MIN, f64::max);
        let min = values.iter().copied().fold(f64::MAX, f64::min);
        1.0 - (max - min)
    }
}

fn effective_weights(request: &StrategyRequest, maxima: (f64, f64, f64)) -> Option<EffectiveWeights> {
    let w = request.weights;
    let keep = |weight: f64, max: f64| if max > INFORMATIVE_FLOOR { weight } else { 0.0 };

    let knowledge = keep(w.knowledge_weight, maxima.0);
    let context = keep(w.context_weight, maxima.1);
    let semantic = keep(w.semantic_weight, maxima.2);
    let total = knowledge + context + semantic;
    if total <= f64::EPSILON {
        return None;
    }

    Some(EffectiveWeights {
        knowledge: knowledge / total,
        context: context / total,
        semantic: semantic / total,
    })
}

#[async_trait]
impl SearchStrategy for AdaptiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Adaptive
    }

    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>> {
        let scored = signals::score_catalog(self.store.as_ref(), request, false).await?;
        let Some(weights) = effective_weights(request, scored.maxima()) else {
            tracing::debug!(query_type = %request.query_type, "No informative signal");
            return Ok(Vec::new());
        };
        let semantic_note = if scored.semantic_available {
            ""
        } else {
            tracing::debug!("Query embedding unavailable, blending without semantic signal");
            " (semantic unavailable)"
        };

        let mut candidates: Vec<Candidate> = scored
            .records
            .iter()
            .zip(&scored.signals)
            .filter_map(|(record, s)| {
                let score = s.blend(weights.knowledge, weights.context, weights.semantic);
                if score < MIN_RELEVANCE {
                    return None;
                }
                let confidence = 0.7 * score + 0.3 * weights.agreement(s);
                Some(
                    Candidate::from_record(record, score, self.kind())
                        .with_confidence(confidence)
                        .with_reasoning(format!(
                            "{} of 3 signals informative; weights knowledge {:.2}, context {:.2}, semantic {:.2}{}",
                            weights.active(),
                            weights.knowledge,
                            weights.context,
                            weights.semantic,
                            semantic_note
                        )),
                )
            })
            .collect();

        sort_by_score(&mut candidates);
        candidates.truncate(request.k);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryToolStore;
    use crate::strategy::test_support::catalog;

    #[test]
    fn test_uninformative_signals_are_dropped() {
        let request = StrategyRequest::new("something to help my team", 5);
        let weights = effective_weights(&request, (0.0, 0.8, 0.0)).unwrap();
        assert_eq!(weights.context, 1.0);
        assert_eq!(weights.active(), 1);

        assert!(effective_weights(&request, (0.0, 0.0, 0.01)).is_none());
    }

    #[test]
    fn test_weights_renormalise() {
        let request = StrategyRequest::new("best tool for UI mockups", 5);
        let weights = effective_weights(&request, (0.9, 0.9, 0.0)).unwrap();
        assert!((weights.knowledge + weights.context - 1.0).abs() < 1e-9);
        assert_eq!(weights.semantic, 0.0);
    }

    #[test]
    fn test_agreement() {
        let weights = EffectiveWeights {
            knowledge: 0.5,
            context: 0.5,
            semantic: 0.0,
        };
        let agreeing = Signals {
            knowledge: 0.8,
            context: 0.8,
            semantic: 0.0,
        };
        let disagreeing = Signals {
            knowledge: 1.0,
            context: 0.2,
            semantic: 0.9,
        };
        assert!((weights.agreement(&agreeing) - 1.0).abs() < 1e-9);
        assert!((weights.agreement(&disagreeing) - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_works_without_embeddings() {
        let strategy = AdaptiveStrategy::new(Arc::new(InMemoryToolStore::from_records(catalog())));
        let candidates = strategy
            .execute(&StrategyRequest::new("invoicing and bookkeeping", 3))
            .await
            .unwrap();

        assert_eq!(candidates[0].id, "quickbooks");
        assert_eq!(candidates[0].strategy_used, StrategyKind::Adaptive);
        let confidence = candidates[0].confidence_score.unwrap();
        assert!(confidence > 0.5 && confidence <= 1.0);
        assert!(
            candidates[0]
                .reasoning
                .as_deref()
                .unwrap()
                .ends_with("(semantic unavailable)")
        );
    }

    #[tokio::test]
    async fn test_reasoning_omits_note_with_embeddings() {
        use crate::embedding::{EmbeddingGenerator, HashEmbedder, QueryEmbedding};
        use crate::strategy::test_support::embedded_store;

        let generator: Arc<dyn EmbeddingGenerator> = Arc::new(HashEmbedder::default());
        let query = "invoicing and bookkeeping";
        let request = StrategyRequest::new(query, 3)
            .with_embedding(QueryEmbedding::new(query, Some(generator), None));
        let strategy = AdaptiveStrategy::new(Arc::new(embedded_store().await));

        let candidates = strategy.execute(&request).await.unwrap();
        assert!(!candidates.is_empty());
        assert!(
            candidates
                .iter()
                .all(|c| !c.reasoning.as_deref().unwrap().contains("semantic unavailable"))
        );
    }

    #[tokio::test]
    async fn test_nothing_informative_is_empty() {
        let strategy = AdaptiveStrategy::new(Arc::new(InMemoryToolStore::from_records(catalog())));
        let candidates = strategy
            .execute(&StrategyRequest::new("zzz qqq", 3))
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}
