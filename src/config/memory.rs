//! In-memory configuration source for tests and code-defined settings.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ConfigResult;
use super::source::ConfigSource;

#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    data: RwLock<HashMap<String, String>>,
    name: String,
}

impl MemoryConfigSource {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    /// Builder-style insert used before the source is shared.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.get_mut().insert(key.into(), value.into());
        self
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.data.write().await.insert(key.into(), value.into());
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.data.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConfigSource for MemoryConfigSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
