//! In-memory vector index.
//!
//! Stores vectors per destination key in nested hash maps and answers
//! queries with brute-force cosine similarity. Good enough for benchmark
//! corpora and for tests; nothing is persisted.

use async_trait::async_trait;
use chunkbench_core::{IndexError, IndexMatch, IndexRecord, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

type Destination = HashMap<Uuid, (Vec<f32>, serde_json::Value)>;

/// In-memory vector index with isolated destinations.
///
/// Cloning is cheap and clones share storage.
#[derive(Clone)]
pub struct MemoryIndex {
    dimension: usize,
    destinations: Arc<RwLock<HashMap<String, Destination>>>,
    initialized: Arc<RwLock<bool>>,
}

impl MemoryIndex {
    /// Create a new in-memory index accepting vectors of `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            destinations: Arc::new(RwLock::new(HashMap::new())),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Remove a destination and everything in it. Returns the number of
    /// vectors dropped.
    pub async fn drop_destination(&self, destination_key: &str) -> usize {
        let removed = self
            .destinations
            .write()
            .await
            .remove(destination_key)
            .map_or(0, |d| d.len());
        debug!("Dropped destination {} ({} vectors)", destination_key, removed);
        removed
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() == self.dimension {
            Ok(())
        } else {
            Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            })
        }
    }

    /// Cosine similarity; zero when either vector has no magnitude.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn init(&self) -> Result<(), IndexError> {
        let mut initialized = self.initialized.write().await;
        *initialized = true;
        debug!("MemoryIndex initialized (dimension: {})", self.dimension);
        Ok(())
    }

    async fn upsert(
        &self,
        destination_key: &str,
        chunk_id: Uuid,
        vector: Vec<f32>,
        payload: serde_json::Value,
    ) -> Result<(), IndexError> {
        self.check_dimension(&vector)?;
        self.destinations
            .write()
            .await
            .entry(destination_key.to_string())
            .or_default()
            .insert(chunk_id, (vector, payload));
        Ok(())
    }

    async fn upsert_batch(
        &self,
        destination_key: &str,
        records: Vec<IndexRecord>,
    ) -> Result<(), IndexError> {
        for record in &records {
            self.check_dimension(&record.vector)?;
        }

        let count = records.len();
        let mut destinations = self.destinations.write().await;
        let destination = destinations.entry(destination_key.to_string()).or_default();
        for record in records {
            destination.insert(record.chunk_id, (record.vector, record.payload));
        }
        debug!("Upserted {} vectors into {}", count, destination_key);
        Ok(())
    }

    async fn query(
        &self,
        destination_key: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        self.check_dimension(vector)?;
        let destinations = self.destinations.read().await;
        let Some(destination) = destinations.get(destination_key) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &Uuid, &serde_json::Value)> = destination
            .iter()
            .map(|(id, (stored, payload))| (Self::cosine_similarity(vector, stored), id, payload))
            .collect();

        // Best score first; ties by id so results are reproducible.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, id, payload)| IndexMatch {
                chunk_id: *id,
                score,
                payload: payload.clone(),
            })
            .collect())
    }

    async fn count(&self, destination_key: &str) -> Result<usize, IndexError> {
        Ok(self
            .destinations
            .read()
            .await
            .get(destination_key)
            .map_or(0, HashMap::len))
    }

    async fn destinations(&self) -> Result<Vec<String>, IndexError> {
        let mut keys: Vec<String> = self.destinations.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
