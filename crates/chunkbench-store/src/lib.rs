//! Vector index implementations for chunkbench.
//!
//! The benchmark orchestrator writes each strategy's chunks to its own
//! destination key. This crate provides [`MemoryIndex`], a brute-force
//! in-memory implementation of [`VectorIndex`](chunkbench_core::VectorIndex)
//! that keeps destinations fully isolated.
//!
//! # Example
//!
//! ```rust
//! use chunkbench_store::MemoryIndex;
//! use chunkbench_core::VectorIndex;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = MemoryIndex::new(3);
//! index.init().await?;
//!
//! let id = uuid::Uuid::new_v4();
//! index.upsert("bench_hierarchical", id, vec![1.0, 0.0, 0.0], serde_json::json!({})).await?;
//!
//! let matches = index.query("bench_hierarchical", &[1.0, 0.0, 0.0], 5).await?;
//! assert_eq!(matches[0].chunk_id, id);
//! # Ok(())
//! # }
//! ```

pub mod memory;

pub use memory::MemoryIndex;
