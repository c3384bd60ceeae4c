//! Embedder pool for concurrent embedding operations.

use chunkbench_core::{EmbedError, Embedder, EmbeddingOutput};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared embedder with a cap on in-flight inference calls.
///
/// Every benchmark run embeds through the same pool, so the cap bounds
/// embedding concurrency across all strategies at once.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl EmbedderPool {
    /// Create a new embedder pool. A cap of zero is raised to one.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Get the underlying embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed a batch of texts, one output per input.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        let outputs = self.embedder.embed_text(texts).await?;
        if outputs.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: outputs.len(),
            });
        }
        Ok(outputs)
    }

    /// Embed a single query.
    pub async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        self.embedder.embed_query(query).await
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
