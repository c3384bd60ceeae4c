//! Chunking strategies for chunkbench.
//!
//! Every strategy shares one contract: [`Strategy::assemble`] turns a parsed
//! document into ordered [`Chunk`](chunkbench_core::Chunk)s. Strategies only
//! decide where chunks begin and end; the [`assembly`] toolkit enforces the
//! size rules and builds the chunks.
//!
//! | Strategy | Registry | Overlap |
//! |----------|----------|---------|
//! | `row_based` | benchmark | whole trailing rows |
//! | `hierarchical` | benchmark | no |
//! | `column_semantic` | benchmark | no |
//! | `adaptive_smart` | benchmark | no |
//! | `entity_centric` | benchmark | no |
//! | `sliding_window` | benchmark | exact chars |
//! | `topic_clustering` | benchmark | no |
//! | `structure_aware_hierarchical` | markdown | no |
//! | `semantic_block_fusion` | markdown | no |

pub mod assembly;
pub mod registry;
pub mod strategy;

mod adaptive_smart;
mod block_fusion;
mod column_semantic;
mod entity_centric;
mod hierarchical;
mod params;
mod row_based;
mod sliding_window;
mod structure_aware;
mod text;
mod topic_clustering;

pub use registry::{Constructor, StrategyRegistry};
pub use strategy::{Strategy, StrategyKind};
