//! Feature-hashing embedder.
//!
//! Each lowercased word is hashed with blake3 into one of `dimension`
//! buckets with a hash-derived sign, and the resulting vector is
//! L2-normalized. Texts that share words get a positive cosine similarity,
//! which is enough to compare retrieval across chunking strategies without a
//! model download. Output is deterministic across runs and platforms.

use async_trait::async_trait;
use chunkbench_core::{EmbedError, Embedder, EmbeddingOutput};

use crate::noop::DEFAULT_DIMENSION;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Zero dimensions are bumped to one.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> EmbeddingOutput {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut token_count = 0;

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            token_count += 1;
            let hash = blake3::hash(word.to_lowercase().as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[idx] += sign;
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        EmbeddingOutput {
            embedding,
            token_count,
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "feature-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}
