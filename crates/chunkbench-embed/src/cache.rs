//! Embedding cache for avoiding redundant computations.
//!
//! Strategies applied to the same corpus often produce identical chunk text
//! (a short section survives every strategy untouched). The cache keys
//! embeddings by a blake3 content hash so each distinct text is embedded
//! once per benchmark.

use async_trait::async_trait;
use chunkbench_core::{EmbedError, Embedder, EmbeddingOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Maximum number of entries in the cache.
const DEFAULT_CACHE_SIZE: usize = 10_000;

#[derive(Clone)]
struct CacheEntry {
    output: EmbeddingOutput,
    /// Access counter for LRU eviction
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drop the least recently used tenth when full.
    fn maybe_evict(&mut self, max_size: usize) {
        if self.entries.len() < max_size {
            return;
        }

        let evict_count = (max_size / 10).max(1);
        let mut by_age: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.last_access))
            .collect();
        by_age.sort_by_key(|(_, access)| *access);

        for (key, _) in by_age.into_iter().take(evict_count) {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries evicted
    pub evictions: u64,
}

/// Embedder wrapper with a content-addressed LRU cache.
///
/// Queries bypass the cache; they are one-off.
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    state: RwLock<CacheState>,
    max_size: usize,
}

impl EmbeddingCache {
    /// Create a new embedding cache with default size.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(embedder, DEFAULT_CACHE_SIZE)
    }

    /// Create a new embedding cache with specified capacity.
    pub fn with_capacity(embedder: Arc<dyn Embedder>, max_size: usize) -> Self {
        Self {
            embedder,
            state: RwLock::new(CacheState::default()),
            max_size: max_size.max(1),
        }
    }

    fn hash_text(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    /// Get the underlying embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.read().await.stats
    }

    pub async fn size(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn clear(&self) {
        self.state.write().await.entries.clear();
    }
}

#[async_trait]
impl Embedder for EmbeddingCache {
    fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let mut results: Vec<Option<EmbeddingOutput>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        {
            let mut state = self.state.write().await;
            for (i, text) in texts.iter().enumerate() {
                let hash = Self::hash_text(text);
                let now = state.tick();
                if let Some(entry) = state.entries.get_mut(&hash) {
                    entry.last_access = now;
                    results.push(Some(entry.output.clone()));
                    state.stats.hits += 1;
                } else {
                    state.stats.misses += 1;
                    uncached_texts.push(*text);
                    uncached_indices.push(i);
                    results.push(None);
                }
            }
        }

        if !uncached_texts.is_empty() {
            debug!("Cache miss for {} texts, embedding", uncached_texts.len());

            let fresh = self.embedder.embed_text(&uncached_texts).await?;
            if fresh.len() != uncached_texts.len() {
                return Err(EmbedError::CountMismatch {
                    expected: uncached_texts.len(),
                    got: fresh.len(),
                });
            }

            let mut state = self.state.write().await;
            for ((text, idx), output) in uncached_texts.iter().zip(uncached_indices).zip(fresh) {
                state.maybe_evict(self.max_size);
                let last_access = state.tick();
                state.entries.insert(
                    Self::hash_text(text),
                    CacheEntry {
                        output: output.clone(),
                        last_access,
                    },
                );
                results[idx] = Some(output);
            }
        }

        let expected = texts.len();
        let outputs: Vec<EmbeddingOutput> = results.into_iter().flatten().collect();
        if outputs.len() != expected {
            return Err(EmbedError::CountMismatch {
                expected,
                got: outputs.len(),
            });
        }
        Ok(outputs)
    }

    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        self.embedder.embed_query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 8;

    struct MockEmbedder {
        calls: AtomicUsize,
        embedded: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                embedded: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| EmbeddingOutput {
                    embedding: vec![t.len() as f32; TEST_DIM],
                    token_count: 1,
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_cache_hit() {
        let mock = Arc::new(MockEmbedder::new());
        let cache = EmbeddingCache::new(mock.clone());

        let first = cache.embed_text(&["hello", "world"]).await.unwrap();
        let second = cache.embed_text(&["hello", "world"]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_partial_hit_keeps_order() {
        let mock = Arc::new(MockEmbedder::new());
        let cache = EmbeddingCache::new(mock.clone());

        cache.embed_text(&["bb"]).await.unwrap();
        let outputs = cache.embed_text(&["a", "bb", "ccc"]).await.unwrap();

        assert_eq!(outputs[0].embedding[0], 1.0);
        assert_eq!(outputs[1].embedding[0], 2.0);
        assert_eq!(outputs[2].embedding[0], 3.0);
        assert_eq!(mock.embedded.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_eviction() {
        let mock = Arc::new(MockEmbedder::new());
        let cache = EmbeddingCache::with_capacity(mock, 10);

        let texts: Vec<String> = (0..15).map(|i| format!("text {i}")).collect();
        for text in &texts {
            cache.embed_text(&[text.as_str()]).await.unwrap();
        }

        assert!(cache.size().await <= 10);
        assert!(cache.stats().await.evictions > 0);
    }

    #[tokio::test]
    async fn test_queries_bypass_cache() {
        let mock = Arc::new(MockEmbedder::new());
        let cache = EmbeddingCache::new(mock.clone());

        cache.embed_query("q").await.unwrap();
        cache.embed_query("q").await.unwrap();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.size().await, 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = EmbeddingCache::new(Arc::new(MockEmbedder::new()));
        cache.embed_text(&["x"]).await.unwrap();
        assert_eq!(cache.size().await, 1);
        cache.clear().await;
        assert_eq!(cache.size().await, 0);
        assert_eq!(cache.dimension(), TEST_DIM);
        assert_eq!(cache.model_name(), "mock-embedder");
    }
}
