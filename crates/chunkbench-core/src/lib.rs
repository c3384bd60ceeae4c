//! # chunkbench-core
//!
//! Core types and traits for chunkbench, a document-chunking and
//! strategy-benchmarking engine.
//!
//! This crate provides the foundational abstractions shared by every other
//! crate in the workspace:
//!
//! - **Structure**: [`Element`] values produced by the structural parser
//! - **Assembly**: [`ChunkingConfig`], [`Chunk`] and [`ChunkingResult`]
//! - **Graph**: [`Relationship`] edges between chunks of one assembly run
//! - **Benchmarking**: [`BenchmarkRun`] records and the [`PendingRun`] that finalizes them
//! - **Collaborators**: the [`Embedder`] and [`VectorIndex`] traits
//!
//! ## Pipeline
//!
//! ```text
//! raw text → parser → [Element] → strategy → [Chunk] → inferencer → [Relationship]
//!                                               ↓
//!                              Embedder → VectorIndex(destination_key)
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Element`] | One structurally distinct unit of a document |
//! | [`ChunkingConfig`] | Per-run assembly parameters |
//! | [`Chunk`] | The unit indexed and retrieved |
//! | [`Relationship`] | Directed, confidence-scored edge between chunks |
//! | [`BenchmarkRun`] | One strategy's execution record over one corpus |
//!
//! ## Related Crates
//!
//! - `chunkbench-parse`: structural parser
//! - `chunkbench-chunker`: chunking strategies and registries
//! - `chunkbench-graph`: relationship inference
//! - `chunkbench-embed`: embedders and the embedder pool
//! - `chunkbench-store`: in-memory vector index
//! - `chunkbench-bench`: benchmark orchestration

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    EmbedError, Error, IndexError, ProcessorError, Result, UnknownStrategyError, ValidationError,
};
pub use traits::*;
pub use types::*;
