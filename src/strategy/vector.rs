use std::sync::Arc;

use async_trait::async_trait;

use super::{SearchStrategy, StrategyKind, StrategyRequest, filter_records};
use crate::catalog::{Candidate, ToolRecord, ToolStore, sort_by_score};
use crate::embedding::cosine_similarity;
use crate::{Result, SearchError};

/// Cosine similarity between the query embedding and tool embeddings.
pub struct VectorStrategy {
    store: Arc<dyn ToolStore>,
}

impl VectorStrategy {
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }
}

/// Records carrying an embedding, or an error if the catalog has none.
pub(super) fn embedded_records(records: Vec<ToolRecord>) -> Result<Vec<ToolRecord>> {
    let embedded: Vec<ToolRecord> = records
        .into_iter()
        .filter(|r| r.embedding.is_some())
        .collect();
    if embedded.is_empty() {
        return Err(SearchError::unavailable(
            "vector_index",
            "no tool embeddings in the catalog",
        ));
    }
    Ok(embedded)
}

#[async_trait]
impl SearchStrategy for VectorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Vector
    }

    async fn execute(&self, request: &StrategyRequest) -> Result<Vec<Candidate>> {
        let records = embedded_records(self.store.load_tools().await?)?;
        let query = request.embedding.vector().await?;

        let mut candidates: Vec<Candidate> = filter_records(records, request)
            .iter()
            .filter_map(|record| {
                let similarity = cosine_similarity(&query, record.embedding.as_deref()?);
                (similarity > 0.0).then(|| Candidate::from_record(record, similarity, self.kind()))
            })
            .collect();

        sort_by_score(&mut candidates);
        candidates.truncate(request.k);
        Ok(candidates)
    }
}
