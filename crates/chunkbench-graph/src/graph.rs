//! Adjacency view over inferred relationships.

use chunkbench_core::{Relationship, RelationshipKind};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Relationships indexed by source and target chunk.
#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
    edges: Vec<Relationship>,
    outgoing: HashMap<Uuid, Vec<usize>>,
    incoming: HashMap<Uuid, Vec<usize>>,
}

impl ChunkGraph {
    #[must_use]
    pub fn new(edges: Vec<Relationship>) -> Self {
        let mut outgoing: HashMap<Uuid, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<Uuid, Vec<usize>> = HashMap::new();
        for (idx, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.source_chunk_id).or_default().push(idx);
            incoming.entry(edge.target_chunk_id).or_default().push(idx);
        }
        Self {
            edges,
            outgoing,
            incoming,
        }
    }

    #[must_use]
    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges leaving `chunk_id`, in inference order.
    pub fn edges_from(&self, chunk_id: Uuid) -> impl Iterator<Item = &Relationship> + '_ {
        self.outgoing
            .get(&chunk_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.edges[*idx])
    }

    /// Edges arriving at `chunk_id`, in inference order.
    pub fn edges_to(&self, chunk_id: Uuid) -> impl Iterator<Item = &Relationship> + '_ {
        self.incoming
            .get(&chunk_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.edges[*idx])
    }

    pub fn edges_of_kind(&self, kind: RelationshipKind) -> impl Iterator<Item = &Relationship> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.relationship_kind == kind)
    }

    /// Chunks that `chunk_id` is a hierarchy parent of.
    #[must_use]
    pub fn children_of(&self, chunk_id: Uuid) -> Vec<Uuid> {
        self.edges_from(chunk_id)
            .filter(|e| e.relationship_kind == RelationshipKind::Hierarchy)
            .map(|e| e.target_chunk_id)
            .collect()
    }

    /// Hierarchy parents of `chunk_id`, outermost first.
    #[must_use]
    pub fn parents_of(&self, chunk_id: Uuid) -> Vec<Uuid> {
        self.edges_to(chunk_id)
            .filter(|e| e.relationship_kind == RelationshipKind::Hierarchy)
            .map(|e| e.source_chunk_id)
            .collect()
    }

    /// Edge count per relationship kind.
    #[must_use]
    pub fn counts_by_kind(&self) -> BTreeMap<RelationshipKind, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(edge.relationship_kind).or_insert(0) += 1;
        }
        counts
    }
}

impl From<Vec<Relationship>> for ChunkGraph {
    fn from(edges: Vec<Relationship>) -> Self {
        Self::new(edges)
    }
}
