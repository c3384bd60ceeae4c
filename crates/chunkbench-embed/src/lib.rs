//! # chunkbench-embed
//!
//! Embedding collaborators for chunkbench benchmarks.
//!
//! The orchestrator embeds every chunk a strategy produces and probes the
//! index with sample queries. Real model inference is out of scope here;
//! this crate ships offline embedders that are good enough to compare
//! strategies against each other, plus the plumbing that any embedder is
//! wrapped in.
//!
//! ## Usage
//!
//! ```rust
//! use chunkbench_embed::{EmbedderPool, EmbeddingCache, HashEmbedder};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = EmbeddingCache::new(Arc::new(HashEmbedder::new()));
//! let pool = EmbedderPool::new(Arc::new(cache), 4);
//!
//! let embeddings = pool.embed_batch(&["Hello world", "Chunking"]).await?;
//! assert_eq!(embeddings[0].embedding.len(), 384);
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HashEmbedder`] | Deterministic feature-hashing bag-of-words vectors |
//! | [`NoopEmbedder`] | Zero vectors, for throughput runs and tests |
//! | [`EmbeddingCache`] | LRU cache keyed by content hash |
//! | [`EmbedderPool`] | Concurrent embedding with semaphore limiting |

pub mod cache;
pub mod hash;
pub mod noop;
pub mod pool;

pub use cache::{CacheStats, EmbeddingCache};
pub use hash::HashEmbedder;
pub use noop::{NoopEmbedder, DEFAULT_DIMENSION};
pub use pool::EmbedderPool;
