//! Knowledge, context and semantic relevance signals shared by the
//! knowledge-enhanced and adaptive strategies.

use std::collections::{BTreeSet, HashSet};

use super::StrategyRequest;
use super::lexical::{self, LexicalIndex};
use crate::Result;
use crate::catalog::{ToolRecord, ToolStore};
use crate::classifier;
use crate::embedding::cosine_similarity;

/// Minimum blended score for a record to become a candidate.
pub(crate) const MIN_RELEVANCE: f64 = 0.1;

/// Per-record relevance signals, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Signals {
    /// Curated knowledge: category anchors, tags and explicit name mentions.
    pub knowledge: f64,
    /// Lexical overlap (BM25 scaled by the best match).
    pub context: f64,
    /// Embedding similarity.
    pub semantic: f64,
}

impl Signals {
    pub(crate) fn blend(&self, knowledge: f64, context: f64, semantic: f64) -> f64 {
        (self.knowledge * knowledge + self.context * context + self.semantic * semantic)
            .clamp(0.0, 1.0)
    }
}

pub(crate) struct ScoredCatalog {
    pub records: Vec<ToolRecord>,
    pub signals: Vec<Signals>,
    /// False when the query embedding could not be produced.
    pub semantic_available: bool,
}

impl ScoredCatalog {
    /// Largest value of each signal across records, as
    /// `(knowledge, context, semantic)`.
    pub(crate) fn maxima(&self) -> (f64, f64, f64) {
        self.signals.iter().fold((0.0f64, 0.0f64, 0.0f64), |acc, s| {
            (
                acc.0.max(s.knowledge),
                acc.1.max(s.context),
                acc.2.max(s.semantic),
            )
        })
    }
}

fn words(text: &str) -> String {
    let joined = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    format!(" {joined} ")
}

fn names_record(query_words: &str, record: &ToolRecord) -> bool {
    let name = words(&record.name);
    !name.trim().is_empty() && query_words.contains(&name)
}

/// Score every record that passes the preference filter.
///
/// When `require_semantic` is set, a failure to embed the query is returned
/// to the caller; otherwise the semantic signal is zeroed and
/// `semantic_available` cleared.
pub(crate) async fn score_catalog(
    store: &dyn ToolStore,
    request: &StrategyRequest,
    require_semantic: bool,
) -> Result<ScoredCatalog> {
    let all_records = store.load_tools().await?;
    let query_words = words(&request.query);
    let alternative = classifier::seeks_alternative(&request.query);

    // Categories the query is anchored to, including those of tools it names.
    let mut anchors: BTreeSet<String> = request
        .preferences
        .categories
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    anchors.extend(classifier::mentioned_categories(&request.query));
    for record in all_records.iter().filter(|r| names_record(&query_words, r)) {
        anchors.extend(record.categories.iter().cloned());
    }

    let records: Vec<ToolRecord> = super::filter_records(all_records, request)
        .into_iter()
        .filter(|r| !(alternative && names_record(&query_words, r)))
        .collect();

    let query_vector = match request.embedding.vector().await {
        Ok(vector) => Some(vector),
        Err(e) if require_semantic => return Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "Semantic signal unavailable");
            None
        }
    };

    let context = lexical::scale_by_max(&LexicalIndex::build(&records).scores(&request.query));
    let query_terms: HashSet<String> = lexical::tokenize(&request.query).into_iter().collect();

    let signals = records
        .iter()
        .zip(context)
        .map(|(record, context)| {
            let semantic = match (&query_vector, &record.embedding) {
                (Some(query), Some(tool)) => cosine_similarity(query, tool).clamp(0.0, 1.0),
                _ => 0.0,
            };
            Signals {
                knowledge: knowledge_signal(record, &query_words, &anchors, &query_terms, alternative),
                context,
                semantic,
            }
        })
        .collect();

    Ok(ScoredCatalog {
        records,
        signals,
        semantic_available: query_vector.is_some(),
    })
}

fn knowledge_signal(
    record: &ToolRecord,
    query_words: &str,
    anchors: &BTreeSet<String>,
    query_terms: &HashSet<String>,
    alternative: bool,
) -> f64 {
    if !alternative && names_record(query_words, record) {
        return 1.0;
    }

    let tag_coverage = if query_terms.is_empty() {
        0.0
    } else {
        let tag_terms: HashSet<String> = record
            .tags
            .iter()
            .flat_map(|t| lexical::tokenize(t))
            .collect();
        query_terms.iter().filter(|t| tag_terms.contains(*t)).count() as f64
            / query_terms.len() as f64
    };

    if anchors.is_empty() {
        return tag_coverage;
    }

    let category_overlap =
        anchors.iter().filter(|c| record.in_category(c)).count() as f64 / anchors.len() as f64;
    0.6 * category_overlap + 0.4 * tag_coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryToolStore, PreferenceFilter};
    use crate::embedding::{EmbeddingGenerator, HashEmbedder, QueryEmbedding};
    use crate::strategy::test_support::{catalog, embedded_store};
    use std::sync::Arc;

    fn signals_for<'a>(scored: &'a ScoredCatalog, id: &str) -> &'a Signals {
        let index = scored.records.iter().position(|r| r.id == id).unwrap();
        &scored.signals[index]
    }

    fn embedded(query: &str) -> StrategyRequest {
        let generator: Arc<dyn EmbeddingGenerator> = Arc::new(HashEmbedder::default());
        StrategyRequest::new(query, 5).with_embedding(QueryEmbedding::new(query, Some(generator), None))
    }

    #[tokio::test]
    async fn test_tag_and_context_signals() {
        let store = embedded_store().await;
        let scored = score_catalog(&store, &embedded("UI mockups"), true).await.unwrap();

        let figma = signals_for(&scored, "figma");
        assert_eq!(figma.knowledge, 1.0);
        assert!(figma.context > 0.0);
        assert!(figma.semantic > 0.0);

        let quickbooks = signals_for(&scored, "quickbooks");
        assert_eq!(quickbooks.knowledge, 0.0);
        assert_eq!(quickbooks.context, 0.0);
        assert!(scored.semantic_available);
    }

    #[tokio::test]
    async fn test_name_mention_is_full_knowledge() {
        let store = InMemoryToolStore::from_records(catalog());
        let scored = score_catalog(&store, &StrategyRequest::new("linear", 5), false)
            .await
            .unwrap();
        assert_eq!(signals_for(&scored, "linear").knowledge, 1.0);
        assert!(!scored.semantic_available);
    }

    #[tokio::test]
    async fn test_alternative_excludes_named_tool() {
        let store = InMemoryToolStore::from_records(catalog());
        let request = StrategyRequest::new("alternative to figma", 5);
        let scored = score_catalog(&store, &request, false).await.unwrap();

        assert!(scored.records.iter().all(|r| r.id != "figma"));
        // Figma's category anchors the remaining design tools.
        assert!(signals_for(&scored, "penpot").knowledge > 0.5);
        assert_eq!(signals_for(&scored, "mixpanel").knowledge, 0.0);
    }

    #[tokio::test]
    async fn test_preferences_filter_and_anchor() {
        let store = InMemoryToolStore::from_records(catalog());
        let request = StrategyRequest::new("dashboards", 5)
            .with_preferences(PreferenceFilter::new().category("analytics"));
        let scored = score_catalog(&store, &request, false).await.unwrap();

        assert_eq!(scored.records.len(), 1);
        assert!(signals_for(&scored, "mixpanel").knowledge >= 0.6);
    }

    #[tokio::test]
    async fn test_required_semantic_propagates_error() {
        let store = InMemoryToolStore::from_records(catalog());
        let result = score_catalog(&store, &StrategyRequest::new("ui", 5), true).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_blend() {
        let signals = Signals {
            knowledge: 1.0,
            context: 0.5,
            semantic: 0.0,
        };
        assert!((signals.blend(0.5, 0.2, 0.3) - 0.6).abs() < 1e-9);
    }
}
