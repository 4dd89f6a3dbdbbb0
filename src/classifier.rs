//! Query classification for adaptive strategy weighting.
//!
//! | Query type     | Example                              |
//! |----------------|--------------------------------------|
//! | `Functional`   | `"best tool for UI mockups"`         |
//! | `Category`     | `"analytics dashboards"`             |
//! | `SpecificTool` | `"alternative to figma"`             |
//! | `General`      | `"something to help my team"`        |

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    SpecificTool,
    Functional,
    Category,
    General,
}

impl QueryType {
    pub const ALL: [QueryType; 4] = [
        QueryType::SpecificTool,
        QueryType::Functional,
        QueryType::Category,
        QueryType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpecificTool => "specific_tool",
            Self::Functional => "functional",
            Self::Category => "category",
            Self::General => "general",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category keywords recognised by the classifier.
pub const CATEGORY_KEYWORDS: &[&str] = &[
    "design",
    "development",
    "analytics",
    "communication",
    "productivity",
    "marketing",
    "finance",
    "project-management",
    "project management",
];

/// Tool brands recognised as explicit tool references.
pub const KNOWN_BRANDS: &[&str] = &[
    "figma",
    "sketch",
    "canva",
    "miro",
    "slack",
    "discord",
    "zoom",
    "teams",
    "notion",
    "trello",
    "asana",
    "jira",
    "linear",
    "clickup",
    "monday",
    "github",
    "gitlab",
    "vscode",
    "airtable",
    "hubspot",
    "salesforce",
    "mailchimp",
    "stripe",
    "quickbooks",
    "tableau",
    "mixpanel",
    "zapier",
    "chatgpt",
];

fn superlative_purpose_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(best|top)\b.*\bfor\b").expect("valid superlative regex"))
}

fn category_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives = CATEGORY_KEYWORDS
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b({alternatives})\b")).expect("valid category regex")
    })
}

fn brand_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternatives = KNOWN_BRANDS
            .iter()
            .map(|b| regex::escape(b))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"\b({alternatives})\b")).expect("valid brand regex")
    })
}

fn comparison_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\balternatives?\s+to\s+\S+|\blike\s+\S+.*\bbut\b")
            .expect("valid comparison regex")
    })
}

/// Classify free text into a [`QueryType`].
///
/// Rules are evaluated in priority order and the first match wins:
/// superlative + purpose, category keyword, brand or comparison pattern,
/// then `General`.
pub fn classify(query: &str) -> QueryType {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return QueryType::General;
    }

    if superlative_purpose_regex().is_match(&normalized) {
        return QueryType::Functional;
    }

    if category_regex().is_match(&normalized) {
        return QueryType::Category;
    }

    if brand_regex().is_match(&normalized) || comparison_regex().is_match(&normalized) {
        return QueryType::SpecificTool;
    }

    QueryType::General
}

/// Whether the query asks for something other than a named tool
/// ("alternatives to X", "like X but Y").
pub fn seeks_alternative(query: &str) -> bool {
    comparison_regex().is_match(&query.to_lowercase())
}

/// Brand tokens mentioned in the query, lower-cased.
pub fn mentioned_brands(query: &str) -> Vec<String> {
    let normalized = query.to_lowercase();
    brand_regex()
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Category keywords mentioned in the query, with "project management"
/// folded into its hyphenated form.
pub fn mentioned_categories(query: &str) -> Vec<String> {
    let normalized = query.to_lowercase();
    let mut found: Vec<String> = category_regex()
        .find_iter(&normalized)
        .map(|m| m.as_str().replace(' ', "-"))
        .collect();
    found.dedup();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functional_queries() {
        assert_eq!(classify("best tool for UI mockups"), QueryType::Functional);
        assert_eq!(classify("Top apps for invoicing"), QueryType::Functional);
    }

    #[test]
    fn test_functional_takes_priority_over_category() {
        assert_eq!(
            classify("best design tool for wireframes"),
            QueryType::Functional
        );
    }

    #[test]
    fn test_superlative_without_purpose_is_not_functional() {
        assert_eq!(classify("best analytics"), QueryType::Category);
        assert_eq!(classify("the best"), QueryType::General);
    }

    #[test]
    fn test_category_queries() {
        assert_eq!(classify("analytics dashboards"), QueryType::Category);
        assert_eq!(
            classify("project management for remote teams"),
            QueryType::Category
        );
        assert_eq!(classify("project-management"), QueryType::Category);
    }

    #[test]
    fn test_category_beats_brand() {
        assert_eq!(classify("figma design plugins"), QueryType::Category);
    }

    #[test]
    fn test_specific_tool_queries() {
        assert_eq!(classify("figma"), QueryType::SpecificTool);
        assert_eq!(classify("alternative to Photoshop"), QueryType::SpecificTool);
        assert_eq!(
            classify("alternatives to something expensive"),
            QueryType::SpecificTool
        );
        assert_eq!(
            classify("like Excel but collaborative"),
            QueryType::SpecificTool
        );
    }

    #[test]
    fn test_brand_requires_word_boundary() {
        assert_eq!(classify("zoomed screenshots"), QueryType::General);
    }

    #[test]
    fn test_general_default() {
        assert_eq!(classify("something to help my team"), QueryType::General);
        assert_eq!(classify(""), QueryType::General);
        assert_eq!(classify("   "), QueryType::General);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let queries = [
            "best tool for UI mockups",
            "analytics dashboards",
            "alternative to figma",
            "help me write",
        ];
        for q in queries {
            let padded = format!("  {}  ", q.to_uppercase());
            assert_eq!(classify(q), classify(&padded), "query: {q}");
            assert_eq!(classify(q), classify(q));
        }
    }

    #[test]
    fn test_seeks_alternative() {
        assert!(seeks_alternative("Alternative to Figma"));
        assert!(seeks_alternative("like slack but cheaper"));
        assert!(!seeks_alternative("figma"));
    }

    #[test]
    fn test_mentions() {
        assert_eq!(mentioned_brands("Slack or Zoom?"), vec!["slack", "zoom"]);
        assert_eq!(
            mentioned_categories("Project Management and finance"),
            vec!["project-management", "finance"]
        );
    }
}
