//! No-op embedder.
//!
//! Returns zero-vectors for every input. Useful when a benchmark only cares
//! about chunking and indexing throughput, and for stubbing the embedding
//! collaborator in tests.

use async_trait::async_trait;
use chunkbench_core::{EmbedError, Embedder, EmbeddingOutput};

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 384;

/// No-op embedder that returns zero-vectors.
///
/// # Example
///
/// ```rust
/// use chunkbench_embed::NoopEmbedder;
/// use chunkbench_core::Embedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = NoopEmbedder::new();
/// let outputs = embedder.embed_text(&["Hello", "World"]).await?;
///
/// assert_eq!(outputs.len(), 2);
/// assert_eq!(outputs[0].embedding.len(), 384);
/// assert!(outputs[0].embedding.iter().all(|&v| v == 0.0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    /// Create a new no-op embedder with default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Create a new no-op embedder with custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts
            .iter()
            .map(|_| EmbeddingOutput {
                embedding: vec![0.0; self.dimension],
                token_count: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_new() {
        let embedder = NoopEmbedder::new();
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.model_name(), "noop");
    }

    #[test]
    fn test_noop_with_dimension() {
        let embedder = NoopEmbedder::with_dimension(768);
        assert_eq!(embedder.dimension(), 768);
    }

    #[tokio::test]
    async fn test_noop_embed_text() {
        let embedder = NoopEmbedder::new();
        let outputs = embedder.embed_text(&["Hello", "World"]).await.unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].embedding.len(), 384);
        assert!(outputs[0].embedding.iter().all(|&v| v == 0.0));
        assert_eq!(outputs[0].token_count, 0);
    }

    #[tokio::test]
    async fn test_noop_embed_empty() {
        let embedder = NoopEmbedder::new();
        let outputs = embedder.embed_text(&[]).await.unwrap();
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_noop_embed_query() {
        let embedder = NoopEmbedder::with_dimension(8);
        let output = embedder.embed_query("query").await.unwrap();
        assert_eq!(output.embedding, vec![0.0; 8]);
    }
}
