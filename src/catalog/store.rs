//! Tool metadata stores.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::record::ToolRecord;
use crate::Result;
use crate::embedding::EmbeddingGenerator;

/// Source of tool metadata consumed by the built-in strategies.
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Load every tool record.
    async fn load_tools(&self) -> Result<Vec<ToolRecord>>;
}

/// In-memory tool store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryToolStore {
    tools: Arc<RwLock<Vec<ToolRecord>>>,
}

impl InMemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ToolRecord>) -> Self {
        Self {
            tools: Arc::new(RwLock::new(records.into_iter().collect())),
        }
    }

    /// Insert a record, replacing any record with the same id.
    pub async fn insert(&self, record: ToolRecord) {
        let mut tools = self.tools.write().await;
        match tools.iter_mut().find(|t| t.id == record.id) {
            Some(existing) => *existing = record,
            None => tools.push(record),
        }
    }

    pub async fn remove(&self, id: &str) -> Option<ToolRecord> {
        let mut tools = self.tools.write().await;
        let index = tools.iter().position(|t| t.id == id)?;
        Some(tools.remove(index))
    }

    pub async fn get(&self, id: &str) -> Option<ToolRecord> {
        self.tools.read().await.iter().find(|t| t.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Compute embeddings for records that have none. Returns how many were
    /// filled in.
    pub async fn embed_missing(&self, generator: &dyn EmbeddingGenerator) -> Result<usize> {
        let mut tools = self.tools.write().await;
        let mut filled = 0;
        for tool in tools.iter_mut().filter(|t| t.embedding.is_none()) {
            tool.embedding = Some(generator.embed(&tool.searchable_text()).await?);
            filled += 1;
        }
        tracing::debug!(filled, generator = generator.id(), "Embedded tool records");
        Ok(filled)
    }
}

#[async_trait]
impl ToolStore for InMemoryToolStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_tools(&self) -> Result<Vec<ToolRecord>> {
        Ok(self.tools.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedder;

    #[tokio::test]
    async fn test_insert_replaces_by_id() {
        let store = InMemoryToolStore::new();
        store.insert(ToolRecord::new("a", "Alpha", "first")).await;
        store.insert(ToolRecord::new("a", "Alpha", "second")).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("a").await.unwrap().description, "second");
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemoryToolStore::from_records([ToolRecord::new("a", "Alpha", "")]);
        assert!(store.remove("a").await.is_some());
        assert!(store.remove("a").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_embed_missing() {
        let store = InMemoryToolStore::from_records([
            ToolRecord::new("a", "Alpha", "design tool"),
            ToolRecord::new("b", "Beta", "chat").with_embedding(vec![1.0; 8]),
        ]);
        let embedder = HashEmbedder::new(8);

        assert_eq!(store.embed_missing(&embedder).await.unwrap(), 1);
        assert_eq!(store.embed_missing(&embedder).await.unwrap(), 0);

        let tools = store.load_tools().await.unwrap();
        assert!(tools.iter().all(|t| t.embedding.is_some()));
    }
}
