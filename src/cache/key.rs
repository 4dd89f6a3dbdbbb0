//! Canonical cache keys.

use crate::catalog::PreferenceFilter;

/// Lower-case, trim and collapse inner whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct CacheKey;

impl CacheKey {
    /// Key for a search call.
    ///
    /// Calls with the same meaning produce the same key: query casing and
    /// spacing are normalised and preferences are serialised canonically,
    /// with no preferences equivalent to an empty filter.
    pub fn search(query: &str, k: usize, preferences: Option<&PreferenceFilter>) -> String {
        let preferences = preferences
            .map(PreferenceFilter::canonical)
            .unwrap_or_else(|| PreferenceFilter::default().canonical());
        format!("search:{}:{}:{}", normalize_query(query), k, preferences)
    }

    /// Key for a query embedding produced by `generator_id`.
    pub fn embedding(generator_id: &str, query: &str) -> String {
        format!("embedding:{}:{}", generator_id, normalize_query(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BudgetTier;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Best  Tool\tfor UI "), "best tool for ui");
    }

    #[test]
    fn test_equivalent_searches_share_key() {
        let a = PreferenceFilter::new()
            .categories(["design", "Finance"])
            .budget(BudgetTier::Low);
        let b = PreferenceFilter::new()
            .budget(BudgetTier::Low)
            .category("finance")
            .category("DESIGN");

        assert_eq!(
            CacheKey::search("Best tool for UI", 3, Some(&a)),
            CacheKey::search("  best TOOL for ui ", 3, Some(&b))
        );
    }

    #[test]
    fn test_no_preferences_equals_empty_filter() {
        let empty = PreferenceFilter::new();
        assert_eq!(
            CacheKey::search("q", 5, None),
            CacheKey::search("q", 5, Some(&empty))
        );
    }

    #[test]
    fn test_distinct_inputs_distinct_keys() {
        let free = PreferenceFilter::new().free_only(true);
        assert_ne!(CacheKey::search("q", 5, None), CacheKey::search("q", 6, None));
        assert_ne!(
            CacheKey::search("q", 5, None),
            CacheKey::search("q", 5, Some(&free))
        );
        assert_ne!(CacheKey::search("q", 5, None), CacheKey::search("r", 5, None));
    }
}
