//! Relationship inference for chunkbench.
//!
//! Given the chunks of one assembly run, [`RelationshipInferencer`] derives
//! directed edges between them:
//!
//! | Rule | Kind | Confidence |
//! |------|------|------------|
//! | header parents the chunks under it | `hierarchy` | 1.0 |
//! | link text or anchor names a header | `cross_reference` | 1.0 exact, 0.7 fuzzy |
//! | code chunk follows a prose chunk | `code_context` | 0.9 |
//! | keyword sets overlap (opt-in) | `topic_similarity` | Jaccard, below 1.0 |
//!
//! Chunks reference each other only by id; [`ChunkGraph`] indexes the edge
//! list for adjacency queries.

pub mod graph;
pub mod inferencer;
mod rules;

pub use graph::ChunkGraph;
pub use inferencer::{InferenceConfig, RelationshipInferencer};
pub use rules::{CERTAIN, CODE_CONTEXT, FUZZY_MATCH, MAX_INFERRED};
