//! Tool records as held by a [`ToolStore`](super::ToolStore).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Pricing model of a tool, ordered from cheapest to most expensive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    #[default]
    Free,
    Freemium,
    Paid,
    Enterprise,
}

impl PricingTier {
    pub fn has_free_plan(&self) -> bool {
        matches!(self, Self::Free | Self::Freemium)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub pricing: PricingTier,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ToolRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            url: String::new(),
            logo_url: None,
            categories: BTreeSet::new(),
            pricing: PricingTier::default(),
            tags: Vec::new(),
            embedding: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_logo_url(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categories
            .extend(categories.into_iter().map(|c| c.into().to_lowercase()));
        self
    }

    pub fn with_pricing(mut self, pricing: PricingTier) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text indexed by lexical strategies and fed to embedding generators.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name,
            self.description,
            self.categories
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            self.tags.join(" ")
        )
    }

    pub fn in_category(&self, category: &str) -> bool {
        let category = category.to_lowercase();
        self.categories.contains(&category)
    }
}
