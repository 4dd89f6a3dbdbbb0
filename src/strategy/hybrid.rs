use std::sync::Arc;

use async_trait::async_trait;

use super::lexical::{self, LexicalIndex};
use super::vector::embedded_records;
use super::{SearchStrategy, StrategyKind, StrategyRequest, filter_records};
use crate::Result;
use crate::catalog::{Candidate, ToolStore, sort_by_score};
use crate::embedding::cosine_similarity;

/// Union of BM25 and vector matches, each scaled by its best score, blended
/// by the query type's context/semantic split. Any positive match keeps a
/// positive share of the blend.
pub struct HybridStrategy {
    store: Arc<dyn ToolStore>,
}

impl HybridStrategy {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SearchStrategy for HybridStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>> {
        let records = filter_records(embedded_records(self.store.load_tools().await?)?, request);
        let query = request.embedding.vector().await?;

        let lexical_raw = LexicalIndex::build(&records).scores(&request.query);
        let vector_raw: Vec<f64> = records
            .iter()
            .map(|r| {
                r.embedding
                    .as_deref()
                    .map(|e| cosine_similarity(&query, e))
                    .unwrap_or(0.0)
            })
            .collect();

        let lexical = lexical::scale_by_max(&lexical_raw);
        let vector = lexical::scale_by_max(&vector_raw);
        let (lexical_weight, semantic_weight) = request.weights.lexical_semantic_split();

        let mut candidates: Vec<Candidate> = records
            .iter()
            .enumerate()
            .filter(|(i, _)| lexical_raw[*i] > 0.0 || vector_raw[*i] > 0.0)
            .map(|(i, record)| {
                let score = lexical_weight * lexical[i] + semantic_weight * vector[i];
                Candidate::from_record(record, score, self.kind())
            })
            .collect();

        sort_by_score(&mut candidates);
        candidates.truncate(request.k);
        Ok(candidates)
    }
}
