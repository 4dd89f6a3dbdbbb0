//! Builder for [`ToolSearchEngine`].

use std::sync::Arc;

use super::{SearchOutcome, ToolSearchEngine};
use crate::Result;
use crate::cache::ResultCache;
use crate::catalog::ToolStore;
use crate::config::{ConfigError, SearchConfig};
use crate::embedding::EmbeddingGenerator;
use crate::observability::SearchMetrics;
use crate::resilience::CircuitBreakerRegistry;
use crate::strategy::{self, SearchStrategy};

/// Assembles an engine from strategies and shared services.
///
/// Caches, the circuit registry and metrics may be injected so several
/// engines share them; anything not injected is created from the config.
#[derive(Default)]
pub struct ToolSearchEngineBuilder {
    config: SearchConfig,
    strategies: Vec<Arc<dyn SearchStrategy>>,
    store: Option<Arc<dyn ToolStore>>,
    embedder: Option<Arc<dyn EmbeddingGenerator>>,
    search_cache: Option<Arc<ResultCache<SearchOutcome>>>,
    embedding_cache: Option<Arc<ResultCache<Arc<[f32]>>>>,
    circuits: Option<Arc<CircuitBreakerRegistry>>,
    metrics: Option<Arc<SearchMetrics>>,
}

impl ToolSearchEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a strategy. Registered strategies replace the built-in ones.
    pub fn strategy(mut self, strategy: Arc<dyn SearchStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Store backing the built-in strategies, used when none are registered.
    pub fn store(mut self, store: Arc<dyn ToolStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn embedding_generator(mut self, embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn search_cache(mut self, cache: Arc<ResultCache<SearchOutcome>>) -> Self {
        self.search_cache = Some(cache);
        self
    }

    pub fn embedding_cache(mut self, cache: Arc<ResultCache<Arc<[f32]>>>) -> Self {
        self.embedding_cache = Some(cache);
        self
    }

    pub fn circuit_registry(mut self, circuits: Arc<CircuitBreakerRegistry>) -> Self {
        self.circuits = Some(circuits);
        self
    }

    pub fn metrics(mut self, metrics: Arc<SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate the config and order the strategies by its chain.
    ///
    /// Every kind in the chain needs a registered strategy; registered
    /// strategies outside the chain are ignored.
    pub fn build(self) -> Result<ToolSearchEngine> {
        self.config.validate()?;

        let registered = if self.strategies.is_empty() {
            match self.store {
                Some(store) => strategy::default_strategies(store),
                None => {
                    return Err(ConfigError::invalid(
                        "search.chain",
                        "no strategies registered and no tool store to build them from",
                    )
                    .into());
                }
            }
        } else {
            self.strategies
        };

        let mut chain = Vec::with_capacity(self.config.chain.len());
        for kind in &self.config.chain {
            let strategy = registered
                .iter()
                .find(|s| s.kind() == *kind)
                .ok_or_else(|| {
                    ConfigError::invalid(
                        "search.chain",
                        format!("no strategy registered for '{kind}'"),
                    )
                })?;
            chain.push(Arc::clone(strategy));
        }
        for unused in registered.iter().filter(|s| !self.config.chain.contains(&s.kind())) {
            tracing::debug!(strategy = %unused.kind(), "Registered strategy not in chain");
        }

        let search_cache = self
            .search_cache
            .unwrap_or_else(|| Arc::new(ResultCache::new(self.config.cache.search.clone())));
        let embedding_cache = self
            .embedding_cache
            .unwrap_or_else(|| Arc::new(ResultCache::new(self.config.cache.embedding.clone())));
        let circuits = self
            .circuits
            .unwrap_or_else(|| Arc::new(CircuitBreakerRegistry::new(self.config.circuit.clone())));

        Ok(ToolSearchEngine {
            chain,
            embedder: self.embedder,
            search_cache,
            embedding_cache,
            circuits,
            metrics: self.metrics.unwrap_or_default(),
            config: self.config,
        })
    }
}
