//! Relationship inferencer.

use chunkbench_core::{Chunk, Relationship, RelationshipKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::rules;

/// Which rules run, and the similarity cut-off for topic edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub hierarchy: bool,
    pub cross_references: bool,
    pub code_context: bool,
    /// Keyword-overlap edges; off unless asked for
    pub topic_similarity: bool,
    /// Minimum Jaccard similarity for a topic edge
    pub topic_threshold: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            hierarchy: true,
            cross_references: true,
            code_context: true,
            topic_similarity: false,
            topic_threshold: 0.5,
        }
    }
}

/// Derives directed, confidence-scored edges between the chunks of one
/// assembly run.
///
/// Rules run in precedence order: hierarchy, cross-reference, code context,
/// then topic similarity. A rule yields at most one edge per ordered chunk
/// pair; edges of different kinds may connect the same pair. Inference is a
/// pure function of the chunk sequence and never yields self-loops.
#[derive(Debug, Clone, Default)]
pub struct RelationshipInferencer {
    config: InferenceConfig,
}

impl RelationshipInferencer {
    #[must_use]
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infer relationships for chunks of a single document, in chunk order.
    #[must_use]
    pub fn infer(&self, chunks: &[Chunk]) -> Vec<Relationship> {
        let mut edges = Vec::new();
        if self.config.hierarchy {
            edges.extend(rules::hierarchy(chunks));
        }
        if self.config.cross_references {
            edges.extend(rules::cross_references(chunks));
        }
        if self.config.code_context {
            edges.extend(rules::code_context(chunks));
        }
        if self.config.topic_similarity {
            edges.extend(rules::topic_similarity(
                chunks,
                self.config.topic_threshold,
            ));
        }

        let mut seen: HashSet<(uuid::Uuid, uuid::Uuid, RelationshipKind)> = HashSet::new();
        edges.retain(|e| {
            e.source_chunk_id != e.target_chunk_id
                && seen.insert((e.source_chunk_id, e.target_chunk_id, e.relationship_kind))
        });

        debug!(
            "Inferred {} relationships over {} chunks",
            edges.len(),
            chunks.len()
        );
        edges
    }
}
