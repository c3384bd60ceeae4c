//! Collaborator traits.
//!
//! The engine consumes, but does not implement, an embedding provider and a
//! vector index. Both are injected into the orchestrator as trait objects:
//!
//! - [`Embedder`]: turn chunk text into vectors
//! - [`VectorIndex`]: store and query vectors under an opaque destination key
//!
//! Calls on these traits are the only suspension points of a benchmark run.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{EmbedError, IndexError};
use crate::types::{EmbeddingOutput, IndexMatch};

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one output per input in the same order.
    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a query (may use different instruction).
    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Index
// ============================================================================

/// A vector ready to be written to a destination.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub chunk_id: Uuid,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

/// Trait for namespaced vector storage and search.
///
/// `destination_key` is an opaque namespace. Implementations must keep
/// destinations isolated from each other; nothing else about their layout is
/// assumed.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Initialize the index.
    async fn init(&self) -> Result<(), IndexError>;

    /// Insert or replace one vector.
    async fn upsert(
        &self,
        destination_key: &str,
        chunk_id: Uuid,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), IndexError>;

    /// Insert or replace many vectors.
    async fn upsert_batch(
        &self,
        destination_key: &str,
        records: Vec<IndexRecord>,
    ) -> Result<(), IndexError> {
        for record in records {
            self.upsert(destination_key, record.chunk_id, record.vector, record.payload)
                .await?;
        }
        Ok(())
    }

    /// Return the `limit` best matches for `vector`, best first.
    async fn query(
        &self,
        destination_key: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<IndexMatch>, IndexError>;

    /// Number of vectors stored under a destination.
    async fn count(&self, destination_key: &str) -> Result<usize, IndexError>;

    /// Known destination keys.
    async fn destinations(&self) -> Result<Vec<String>, IndexError>;
}
