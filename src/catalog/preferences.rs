//! User preference filters forwarded to every strategy and into cache keys.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::{PricingTier, ToolRecord};

/// Budget ceiling expressed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Free,
    Low,
    Medium,
    High,
}

impl BudgetTier {
    /// Most expensive pricing tier this budget accepts.
    pub fn max_pricing(&self) -> PricingTier {
        match self {
            Self::Free => PricingTier::Free,
            Self::Low => PricingTier::Freemium,
            Self::Medium => PricingTier::Paid,
            Self::High => PricingTier::Enterprise,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreferenceFilter {
    /// Category allow-list; empty means any category.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub budget: Option<BudgetTier>,
    #[serde(default)]
    pub free_only: bool,
}

impl PreferenceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into().trim().to_lowercase());
        self
    }

    pub fn categories(mut self, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categories.extend(
            categories
                .into_iter()
                .map(|c| c.into().trim().to_lowercase()),
        );
        self
    }

    pub fn budget(mut self, budget: BudgetTier) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn free_only(mut self, free_only: bool) -> Self {
        self.free_only = free_only;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.budget.is_none() && !self.free_only
    }

    pub fn matches(&self, record: &ToolRecord) -> bool {
        if !self.categories.is_empty()
            && !self.categories.iter().any(|c| record.in_category(c))
        {
            return false;
        }

        if let Some(budget) = self.budget
            && record.pricing > budget.max_pricing()
        {
            return false;
        }

        if self.free_only && !record.pricing.has_free_plan() {
            return false;
        }

        true
    }

    /// Stable serialization used in cache keys.
    ///
    /// Categories are trimmed, lower-cased and sorted, so filters built in a
    /// different order or casing serialize identically.
    pub fn canonical(&self) -> String {
        let normalized = Self {
            categories: self
                .categories
                .iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            budget: self.budget,
            free_only: self.free_only,
        };
        serde_json::to_string(&normalized).unwrap_or_default()
    }
}
