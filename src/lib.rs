//! # tool-search
//!
//! Adaptive multi-strategy search over a catalog of tools.
//!
//! A query is classified, weighted, and run through an ordered chain of
//! retrieval strategies. Each strategy has its own circuit breaker, the most
//! expressive strategies must clear a confidence threshold, and accepted
//! results are cached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tool_search::{HashEmbedder, InMemoryToolStore, ToolRecord, ToolSearchEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tool_search::SearchError> {
//!     let embedder = Arc::new(HashEmbedder::default());
//!     let store = InMemoryToolStore::from_records([
//!         ToolRecord::new("figma", "Figma", "Interface design and UI mockups")
//!             .with_categories(["design"]),
//!     ]);
//!     store.embed_missing(embedder.as_ref()).await?;
//!
//!     let engine = ToolSearchEngine::builder()
//!         .store(Arc::new(store))
//!         .embedding_generator(embedder)
//!         .build()?;
//!
//!     let outcome = engine.search("best tool for UI mockups", 3, None).await;
//!     for candidate in &outcome.candidates {
//!         println!("{} ({:.2}) via {}", candidate.name, candidate.score, candidate.strategy_used);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod confidence;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod resilience;
pub mod strategy;
pub mod weights;

pub use cache::{CacheConfig, CacheKey, CacheStats, CacheType, ResultCache};
pub use catalog::{
    BudgetTier, Candidate, InMemoryToolStore, PreferenceFilter, PricingTier, ToolRecord, ToolStore,
};
pub use classifier::{QueryType, classify};
pub use config::{ConfigError, ConfigSource, SearchConfig};
pub use embedding::{EmbeddingGenerator, HashEmbedder, QueryEmbedding, cosine_similarity};
pub use engine::{AttemptRecord, AttemptStatus, SearchOutcome, ToolSearchEngine, ToolSearchEngineBuilder};
pub use error::{ErrorCategory, ErrorKind, Result, SearchError};
pub use observability::{MetricsSummary, SearchMetrics};
pub use resilience::{
    CircuitBreakerRegistry, CircuitConfig, CircuitSnapshot, ExponentialBackoff, RetryConfig,
};
pub use strategy::{SearchStrategy, StrategyKind, StrategyRequest};
pub use weights::{StrategyWeights, weights_for};
