//! Embedding generation.
//!
//! Production deployments plug in a model-backed [`EmbeddingGenerator`];
//! [`HashEmbedder`] is a deterministic, non-semantic fallback used offline and
//! in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::cache::{CacheKey, ResultCache};
use crate::{Result, SearchError};

#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Stable identifier, also used to namespace cached query vectors.
    fn id(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// FNV-1a feature-hashing embedder.
///
/// Each lower-cased alphanumeric token is hashed into one of `dimension`
/// buckets with a sign bit; the result is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            id: format!("fnv-hash-{dimension}"),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        token.bytes().fold(OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(PRIME)
        })
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::fnv1a(token);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingGenerator for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Query embedding computed at most once per search call and shared by every
/// strategy that needs it.
///
/// Failures are not memoised, so a retried attempt calls the generator again.
#[derive(Clone)]
pub struct QueryEmbedding {
    text: Arc<str>,
    generator: Option<Arc<dyn EmbeddingGenerator>>,
    cache: Option<Arc<ResultCache<Arc<[f32]>>>>,
    cell: Arc<OnceCell<Arc<[f32]>>>,
}

impl QueryEmbedding {
    pub fn new(
        text: impl Into<Arc<str>>,
        generator: Option<Arc<dyn EmbeddingGenerator>>,
        cache: Option<Arc<ResultCache<Arc<[f32]>>>>,
    ) -> Self {
        Self {
            text: text.into(),
            generator,
            cache,
            cell: Arc::new(OnceCell::new()),
        }
    }

    /// An embedding that is already known.
    pub fn fixed(vector: Vec<f32>) -> Self {
        let this = Self::new("", None, None);
        let _ = this.cell.set(Arc::from(vector));
        this
    }

    /// An embedding that can never be produced.
    pub fn unavailable() -> Self {
        Self::new("", None, None)
    }

    pub fn is_computed(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn vector(&self) -> Result<Arc<[f32]>> {
        self.cell
            .get_or_try_init(|| async {
                let Some(generator) = &self.generator else {
                    return Err(SearchError::unavailable(
                        "embedding_generator",
                        "no embedding generator configured",
                    ));
                };

                let key = CacheKey::embedding(generator.id(), &self.text);
                if let Some(cache) = &self.cache
                    && let Some(hit) = cache.get(&key)
                {
                    return Ok(hit);
                }

                let vector: Arc<[f32]> = Arc::from(generator.embed(&self.text).await?);
                if let Some(cache) = &self.cache {
                    cache.set(key, Arc::clone(&vector));
                }
                Ok(vector)
            })
            .await
            .cloned()
    }
}

impl std::fmt::Debug for QueryEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEmbedding")
            .field("text", &self.text)
            .field("generator", &self.generator.as_ref().map(|g| g.id().to_string()))
            .field("computed", &self.is_computed())
            .finish()
    }
}
