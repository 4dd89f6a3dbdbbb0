//! Engine settings and their loading from a [`ConfigSource`].

use std::collections::HashSet;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::source::{ConfigSource, ConfigSourceExt};
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::cache::CacheConfig;
use crate::resilience::{CircuitConfig, ExponentialBackoff, RetryConfig};
use crate::strategy::StrategyKind;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);
const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub search: CacheConfig,
    pub embedding: CacheConfig,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            search: CacheConfig::search(),
            embedding: CacheConfig::embeddings(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub cache: CacheSettings,
    pub circuit: CircuitConfig,
    pub retry: RetryConfig,
    /// Upper bound on one search call, across the whole chain.
    #[serde(rename = "deadline_ms", with = "super::duration_ms")]
    pub deadline: Duration,
    pub chain: Vec<StrategyKind>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            circuit: CircuitConfig::default(),
            retry: RetryConfig::default(),
            deadline: DEFAULT_DEADLINE,
            chain: StrategyKind::DEFAULT_CHAIN.to_vec(),
        }
    }
}

async fn read<T, S>(source: &S, key: &str) -> ConfigResult<Option<T>>
where
    T: DeserializeOwned + Send,
    S: ConfigSource + ?Sized,
{
    source.get::<T>(key).await
}

async fn read_ms<S: ConfigSource + ?Sized>(source: &S, key: &str) -> ConfigResult<Option<Duration>> {
    Ok(read::<u64, S>(source, key).await?.map(Duration::from_millis))
}

/// Parse a chain given as a JSON array or a comma-separated list.
fn parse_chain(raw: &str) -> ConfigResult<Vec<StrategyKind>> {
    let names: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(names) => names,
        Err(_) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    };
    names
        .iter()
        .map(|name| {
            name.parse::<StrategyKind>()
                .map_err(|e| ConfigError::invalid("search.chain", e.to_string()))
        })
        .collect()
}

impl SearchConfig {
    /// Load settings from `source`, starting from the defaults, then
    /// validate them.
    ///
    /// Recognised keys: `cache.search_capacity`, `cache.search_ttl_ms`,
    /// `cache.embedding_capacity`, `cache.embedding_ttl_ms`,
    /// `cache.sweep_interval_ms`, `circuit.failure_threshold`,
    /// `circuit.reset_window_ms`, `retry.max_retries`,
    /// `retry.initial_backoff_ms`, `retry.max_backoff_ms`,
    /// `search.deadline_ms` and `search.chain`.
    pub async fn from_source<S: ConfigSource + ?Sized>(source: &S) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(capacity) = read(source, "cache.search_capacity").await? {
            config.cache.search.capacity = capacity;
        }
        if let Some(ttl) = read_ms(source, "cache.search_ttl_ms").await? {
            config.cache.search.ttl = ttl;
        }
        if let Some(capacity) = read(source, "cache.embedding_capacity").await? {
            config.cache.embedding.capacity = capacity;
        }
        if let Some(ttl) = read_ms(source, "cache.embedding_ttl_ms").await? {
            config.cache.embedding.ttl = ttl;
        }
        if let Some(interval) = read_ms(source, "cache.sweep_interval_ms").await? {
            config.cache.search.sweep_interval = interval;
            config.cache.embedding.sweep_interval = interval;
        }

        if let Some(threshold) = read(source, "circuit.failure_threshold").await? {
            config.circuit.failure_threshold = threshold;
        }
        if let Some(window) = read_ms(source, "circuit.reset_window_ms").await? {
            config.circuit.reset_window = window;
        }

        if let Some(max_retries) = read(source, "retry.max_retries").await? {
            config.retry.max_retries = max_retries;
        }
        let initial = read_ms(source, "retry.initial_backoff_ms").await?;
        let max = read_ms(source, "retry.max_backoff_ms").await?;
        if initial.is_some() || max.is_some() {
            let current = &config.retry.backoff;
            config.retry.backoff = ExponentialBackoff::new(
                initial.unwrap_or(current.initial()),
                max.unwrap_or(current.max()),
                2.0,
            );
        }

        if let Some(deadline) = read_ms(source, "search.deadline_ms").await? {
            config.deadline = deadline;
        }
        if let Some(raw) = source.get_raw("search.chain").await? {
            config.chain = parse_chain(&raw)?;
        }

        tracing::debug!(source = source.name(), "Loaded search configuration");
        config.validate()?;
        Ok(config)
    }

    /// Check every setting, reporting all violations at once.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        for (name, cache) in [("search", &self.cache.search), ("embedding", &self.cache.embedding)] {
            if cache.ttl.is_zero() {
                errors.push(ConfigError::invalid(
                    format!("cache.{name}_ttl_ms"),
                    "must be greater than zero",
                ));
            }
            if cache.sweep_interval.is_zero() {
                errors.push(ConfigError::invalid(
                    "cache.sweep_interval_ms",
                    "must be greater than zero",
                ));
            }
        }

        if self.circuit.failure_threshold == 0 {
            errors.push(ConfigError::invalid(
                "circuit.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.circuit.reset_window.is_zero() {
            errors.push(ConfigError::invalid(
                "circuit.reset_window_ms",
                "must be greater than zero",
            ));
        }

        if self.retry.max_retries > MAX_RETRIES_LIMIT {
            errors.push(ConfigError::invalid(
                "retry.max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}"),
            ));
        }
        if self.retry.backoff.initial() > self.retry.backoff.max() {
            errors.push(ConfigError::invalid(
                "retry.initial_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }

        if self.deadline.is_zero() {
            errors.push(ConfigError::invalid(
                "search.deadline_ms",
                "must be greater than zero",
            ));
        }

        if self.chain.is_empty() {
            errors.push(ConfigError::invalid("search.chain", "must not be empty"));
        }
        let mut seen = HashSet::new();
        for kind in &self.chain {
            if !seen.insert(kind) {
                errors.push(ConfigError::invalid(
                    "search.chain",
                    format!("strategy '{kind}' listed more than once"),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }
}
