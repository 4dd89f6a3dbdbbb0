//! BM25 scoring over tool records.

use std::collections::{HashMap, HashSet};

use crate::catalog::ToolRecord;

const K1: f64 = 1.2;
const B: f64 = 0.75;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "app", "apps", "best", "for", "help", "i", "in", "me", "my", "of", "on",
    "or", "something", "the", "to", "tool", "tools", "top", "with",
];

/// Lower-cased alphanumeric tokens, stop words removed.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Term statistics for one snapshot of the catalog.
pub(crate) struct LexicalIndex {
    docs: Vec<Vec<String>>,
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

impl LexicalIndex {
    pub(crate) fn build(records: &[ToolRecord]) -> Self {
        let docs: Vec<Vec<String>> = records
            .iter()
            .map(|r| tokenize(&r.searchable_text()))
            .collect();

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            let unique: HashSet<&String> = doc.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
        }

        let avg_doc_len =
            docs.iter().map(Vec::len).sum::<usize>() as f64 / docs.len().max(1) as f64;

        Self {
            docs,
            doc_freq,
            avg_doc_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// BM25 score of every record, in record order.
    pub(crate) fn scores(&self, query: &str) -> Vec<f64> {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return vec![0.0; self.docs.len()];
        }

        self.docs
            .iter()
            .map(|doc| {
                let doc_len = doc.len() as f64;
                terms
                    .iter()
                    .map(|term| {
                        let tf = doc.iter().filter(|w| *w == term).count() as f64;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let numerator = tf * (K1 + 1.0);
                        let denominator =
                            tf + K1 * (1.0 - B + B * (doc_len / self.avg_doc_len.max(1.0)));
                        self.idf(term) * (numerator / denominator)
                    })
                    .sum()
            })
            .collect()
    }
}

/// Fraction of query terms that occur as substrings of each record's text.
pub(crate) fn loose_scores(records: &[ToolRecord], query: &str) -> Vec<f64> {
    let terms: Vec<String> = tokenize(query)
        .into_iter()
        .filter(|t| t.chars().count() >= 3)
        .collect();
    if terms.is_empty() {
        return vec![0.0; records.len()];
    }

    records
        .iter()
        .map(|record| {
            let text = record.searchable_text().to_lowercase();
            let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
            hits as f64 / terms.len() as f64
        })
        .collect()
}

/// Scale scores into `[0, 1]` by dividing by the maximum.
pub(crate) fn scale_by_max(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s / max).max(0.0)).collect()
}
