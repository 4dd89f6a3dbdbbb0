//! Fallback orchestration across the strategy chain.
//!
//! A search call checks the result cache, classifies the query, then walks
//! the chain. Strategies with an open circuit are skipped. Each attempt is
//! retried on transient errors, and the first acceptable result set is
//! cached and returned. An exhausted chain yields an empty outcome, never an
//! error.

mod builder;
mod outcome;

pub use builder::ToolSearchEngineBuilder;
pub use outcome::{AttemptRecord, AttemptStatus, SearchOutcome};

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::cache::{CacheKey, CacheStats, CacheType, ResultCache};
use crate::catalog::PreferenceFilter;
use crate::config::SearchConfig;
use crate::embedding::{EmbeddingGenerator, QueryEmbedding};
use crate::observability::{self, MetricsSummary, SearchMetrics};
use crate::resilience::{CircuitBreakerRegistry, CircuitSnapshot};
use crate::strategy::{SearchStrategy, StrategyKind, StrategyRequest};
use crate::{Result, SearchError, classifier, confidence, weights};

/// Adaptive multi-strategy tool search.
///
/// Cheap to share behind an `Arc`; concurrent searches are supported.
pub struct ToolSearchEngine {
    chain: Vec<Arc<dyn SearchStrategy>>,
    embedder: Option<Arc<dyn EmbeddingGenerator>>,
    search_cache: Arc<ResultCache<SearchOutcome>>,
    embedding_cache: Arc<ResultCache<Arc<[f32]>>>,
    circuits: Arc<CircuitBreakerRegistry>,
    metrics: Arc<SearchMetrics>,
    config: SearchConfig,
}

impl ToolSearchEngine {
    pub fn builder() -> ToolSearchEngineBuilder {
        ToolSearchEngineBuilder::new()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Strategy kinds in the order they are tried.
    pub fn chain(&self) -> Vec<StrategyKind> {
        self.chain.iter().map(|s| s.kind()).collect()
    }

    /// Search for up to `k` tools matching `query`.
    ///
    /// Strategy failures are absorbed: when every strategy is skipped,
    /// fails or is rejected, the outcome is empty with `fell_back` set.
    /// A blank query or `k == 0` returns an empty outcome without touching
    /// the cache or any strategy.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        preferences: Option<&PreferenceFilter>,
    ) -> SearchOutcome {
        let search_id = Uuid::new_v4().to_string();
        let span = observability::search_span(&search_id, k);
        self.search_inner(query, k, preferences)
            .instrument(span)
            .await
    }

    /// [`Self::search`], abandoned as soon as `token` is cancelled.
    ///
    /// A cancelled search returns [`SearchError::Cancelled`] and writes
    /// nothing to the result cache.
    pub async fn search_with_cancellation(
        &self,
        query: &str,
        k: usize,
        preferences: Option<&PreferenceFilter>,
        token: &CancellationToken,
    ) -> Result<SearchOutcome> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.metrics.cancelled.inc();
                info!("Search cancelled");
                Err(SearchError::Cancelled)
            }
            outcome = self.search(query, k, preferences) => Ok(outcome),
        }
    }

    async fn search_inner(
        &self,
        query: &str,
        k: usize,
        preferences: Option<&PreferenceFilter>,
    ) -> SearchOutcome {
        let span = tracing::Span::current();
        let query_type = classifier::classify(query);
        span.record("query_type", query_type.as_str());

        if query.trim().is_empty() || k == 0 {
            debug!("Blank query or zero k, nothing to search");
            return SearchOutcome::empty(query_type);
        }

        let _active = self.metrics.active_searches.track();
        let started = Instant::now();
        self.metrics.searches.inc();

        let key = CacheKey::search(query, k, preferences);
        if let Some(mut cached) = self.search_cache.get(&key) {
            cached.from_cache = true;
            self.metrics.cache_hits.inc();
            span.record("from_cache", true);
            debug!("Search served from cache");
            self.finish(&span, &cached, started);
            return cached;
        }

        let weights = weights::weights_for(query_type);
        let request = StrategyRequest {
            query: query.to_string(),
            k,
            query_type,
            weights,
            preferences: preferences.cloned().unwrap_or_default(),
            embedding: QueryEmbedding::new(
                query,
                self.embedder.clone(),
                Some(Arc::clone(&self.embedding_cache)),
            ),
        };

        let outcome = self.run_chain(&request).await;

        if outcome.is_exhausted() {
            self.metrics.exhausted.inc();
            warn!(
                attempted = outcome.attempted_strategies.len(),
                skipped = outcome.skipped_strategies.len(),
                "All strategies exhausted"
            );
        } else {
            if outcome.fell_back {
                self.metrics.fallbacks.inc();
            }
            self.search_cache.set(key, outcome.clone());
        }

        span.record("from_cache", false);
        self.finish(&span, &outcome, started);
        outcome
    }

    fn finish(&self, span: &tracing::Span, outcome: &SearchOutcome, started: Instant) {
        let elapsed = started.elapsed();
        self.metrics.latency.record(elapsed);
        if let Some(strategy) = outcome.strategy_used {
            span.record("strategy_used", strategy.as_str());
        }
        span.record("fell_back", outcome.fell_back);
        span.record("duration_ms", elapsed.as_millis() as u64);
    }

    async fn run_chain(&self, request: &StrategyRequest) -> SearchOutcome {
        let deadline = Instant::now() + self.config.deadline;
        let mut outcome = SearchOutcome::empty(request.query_type);

        for (position, strategy) in self.chain.iter().enumerate() {
            let kind = strategy.kind();
            let counters = self.metrics.strategy(kind);

            if self.circuits.is_open(kind) {
                debug!(strategy = %kind, "Circuit open, skipping strategy");
                counters.skips.inc();
                outcome.skipped_strategies.push(kind);
                continue;
            }

            if Instant::now() >= deadline {
                warn!(strategy = %kind, "Search deadline reached before attempt");
                break;
            }

            outcome.attempted_strategies.push(kind);
            counters.attempts.inc();

            let span = observability::attempt_span(kind, position);
            let started = Instant::now();
            let mut retries = 0;
            let result = tokio::time::timeout_at(
                deadline,
                self.config
                    .retry
                    .execute(&mut retries, || strategy.execute(request)),
            )
            .instrument(span.clone())
            .await;
            let duration_ms = started.elapsed().as_millis() as u64;
            counters.retries.add(u64::from(retries));

            let mut record = AttemptRecord {
                strategy: kind,
                status: AttemptStatus::Empty,
                retries,
                duration_ms,
                candidate_count: 0,
                confidence: None,
            };

            match result {
                Err(_elapsed) => {
                    self.circuits.record_failure(kind);
                    counters.failures.inc();
                    record.status = AttemptStatus::TimedOut;
                    warn!(
                        strategy = %kind,
                        error_kind = %crate::ErrorKind::TimeoutExceeded,
                        duration_ms,
                        retry = retries,
                        "Strategy attempt hit the search deadline"
                    );
                    span.record("status", record.status.as_str());
                    outcome.attempts.push(record);
                    break;
                }
                Ok(Err(e)) => {
                    self.circuits.record_failure(kind);
                    counters.failures.inc();
                    record.status = AttemptStatus::Failed(e.kind());
                    warn!(
                        strategy = %kind,
                        error_kind = %e.kind(),
                        error = %e,
                        duration_ms,
                        retry = retries,
                        "Strategy attempt failed"
                    );
                }
                Ok(Ok(mut candidates)) => {
                    self.circuits.record_success(kind);
                    record.candidate_count = candidates.len();

                    if candidates.is_empty() {
                        debug!(strategy = %kind, duration_ms, "Strategy returned no candidates");
                    } else {
                        let aggregate = confidence::aggregate(&candidates);
                        let threshold = request.weights.confidence_threshold;
                        record.confidence = Some(aggregate);
                        span.record("confidence", aggregate);

                        if kind.is_confidence_gated() && !confidence::accept(aggregate, threshold) {
                            counters.rejections.inc();
                            record.status = AttemptStatus::Rejected;
                            info!(
                                strategy = %kind,
                                confidence = aggregate,
                                threshold,
                                "Result set below confidence threshold"
                            );
                        } else {
                            counters.accepted.inc();
                            record.status = AttemptStatus::Accepted;
                            candidates.truncate(request.k);
                            for candidate in &mut candidates {
                                candidate.strategy_used = kind;
                            }
                            span.record("status", record.status.as_str());
                            span.record("retries", retries);
                            span.record("candidates", candidates.len());
                            span.record("duration_ms", duration_ms);
                            debug!(
                                parent: &span,
                                candidates = candidates.len(),
                                confidence = aggregate,
                                "Strategy result accepted"
                            );

                            outcome.candidates = candidates;
                            outcome.strategy_used = Some(kind);
                            outcome.fell_back = position != 0;
                            outcome.aggregate_confidence = Some(aggregate);
                            outcome.attempts.push(record);
                            return outcome;
                        }
                    }
                }
            }

            span.record("status", record.status.as_str());
            span.record("retries", retries);
            span.record("candidates", record.candidate_count);
            span.record("duration_ms", duration_ms);
            outcome.attempts.push(record);
        }

        outcome
    }

    pub fn cache_stats(&self, cache: CacheType) -> CacheStats {
        match cache {
            CacheType::Search => self.search_cache.stats(),
            CacheType::Embedding => self.embedding_cache.stats(),
        }
    }

    /// Clear one cache or both. With a `pattern`, only keys matching it (as
    /// a regex, or as a substring when it is not one) are removed. Returns
    /// the number of entries removed.
    pub fn clear_cache(&self, cache: Option<CacheType>, pattern: Option<&str>) -> usize {
        let targets: &[CacheType] = match &cache {
            Some(cache) => std::slice::from_ref(cache),
            None => &CacheType::ALL,
        };

        let removed = targets
            .iter()
            .map(|target| match (target, pattern) {
                (CacheType::Search, Some(p)) => self.search_cache.invalidate_matching(p),
                (CacheType::Search, None) => self.search_cache.clear(),
                (CacheType::Embedding, Some(p)) => self.embedding_cache.invalidate_matching(p),
                (CacheType::Embedding, None) => self.embedding_cache.clear(),
            })
            .sum::<usize>();
        info!(?cache, pattern, removed, "Cache cleared");
        removed
    }

    pub fn circuit_breaker_stats(&self) -> BTreeMap<StrategyKind, CircuitSnapshot> {
        self.circuits.stats()
    }

    pub fn reset_circuit_breaker(&self, strategy: StrategyKind) {
        self.circuits.reset(strategy);
    }

    pub fn reset_circuit_breakers(&self) {
        self.circuits.reset_all();
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Start background expiry sweeps for both caches. They stop when
    /// `shutdown` is cancelled or the caches are dropped.
    pub fn spawn_cache_sweepers(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        vec![
            self.search_cache.spawn_sweeper(shutdown.clone()),
            self.embedding_cache.spawn_sweeper(shutdown),
        ]
    }
}

impl std::fmt::Debug for ToolSearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSearchEngine")
            .field("chain", &self.chain())
            .field("embedder", &self.embedder.as_ref().map(|e| e.id().to_string()))
            .field("search_cache", &self.search_cache)
            .field("config", &self.config)
            .finish()
    }
}
