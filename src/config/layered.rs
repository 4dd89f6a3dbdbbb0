//! Ordered stack of configuration sources.

use std::collections::BTreeSet;

use super::ConfigResult;
use super::source::ConfigSource;

/// Chains sources with priority ordering; the first source holding a key
/// wins.
#[derive(Default)]
pub struct LayeredConfigSource {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl LayeredConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source below the ones already added.
    pub fn source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn push(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait::async_trait]
impl ConfigSource for LayeredConfigSource {
    fn name(&self) -> &str {
        "layered"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for source in &self.sources {
            if let Some(value) = source.get_raw(key).await? {
                tracing::trace!(key, source = source.name(), "Config value resolved");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys = BTreeSet::new();
        for source in &self.sources {
            keys.extend(source.list_keys(prefix).await?);
        }
        Ok(keys.into_iter().collect())
    }
}

impl std::fmt::Debug for LayeredConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredConfigSource")
            .field("sources", &self.source_names())
            .finish()
    }
}
