//! The closed set of chunking strategies and the shared `assemble` contract.

use chunkbench_core::{ChunkingConfig, ChunkingResult, Element, ProcessorError, UnknownStrategyError};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

use crate::assembly::{self, Draft, Unit};
use crate::{
    adaptive_smart, block_fusion, column_semantic, entity_centric, hierarchical, row_based,
    sliding_window, structure_aware, topic_clustering,
};

/// Every chunking algorithm the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StrategyKind {
    RowBased,
    Hierarchical,
    ColumnSemantic,
    AdaptiveSmart,
    EntityCentric,
    SlidingWindow,
    TopicClustering,
    StructureAwareHierarchical,
    SemanticBlockFusion,
}

impl StrategyKind {
    /// Strategies of the general benchmark pipeline.
    pub const BENCHMARK: [StrategyKind; 7] = [
        Self::RowBased,
        Self::Hierarchical,
        Self::ColumnSemantic,
        Self::AdaptiveSmart,
        Self::EntityCentric,
        Self::SlidingWindow,
        Self::TopicClustering,
    ];

    /// Markdown-specific strategies.
    pub const MARKDOWN: [StrategyKind; 2] =
        [Self::StructureAwareHierarchical, Self::SemanticBlockFusion];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::RowBased => "row_based",
            Self::Hierarchical => "hierarchical",
            Self::ColumnSemantic => "column_semantic",
            Self::AdaptiveSmart => "adaptive_smart",
            Self::EntityCentric => "entity_centric",
            Self::SlidingWindow => "sliding_window",
            Self::TopicClustering => "topic_clustering",
            Self::StructureAwareHierarchical => "structure_aware_hierarchical",
            Self::SemanticBlockFusion => "semantic_block_fusion",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::BENCHMARK
            .into_iter()
            .chain(Self::MARKDOWN)
            .find(|kind| kind.id() == id)
    }

    /// One-line description of the algorithm.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::RowBased => {
                "Row-based: splits tables and lists into row groups, packing prose between them"
            }
            Self::Hierarchical => {
                "Hierarchical: opens a chunk at every header, packing long sections into parts"
            }
            Self::ColumnSemantic => {
                "Column-semantic: keeps each table whole and annotates its columns"
            }
            Self::AdaptiveSmart => {
                "Adaptive: groups runs of one content class with class-specific size limits"
            }
            Self::EntityCentric => {
                "Entity-centric: starts a chunk whenever the dominant configured entity changes"
            }
            Self::SlidingWindow => {
                "Sliding window: fixed-size windows with overlap, ending at natural breaks"
            }
            Self::TopicClustering => {
                "Topic clustering: keeps adjacent blocks together while their terms stay similar"
            }
            Self::StructureAwareHierarchical => {
                "Structure-aware hierarchical: sections with breadcrumbs, short subsections stay with their parent"
            }
            Self::SemanticBlockFusion => {
                "Semantic block fusion: fuses headings, introductions, code and similar paragraphs"
            }
        }
    }

    /// Whether `overlap` is honoured.
    #[must_use]
    pub fn supports_overlap(self) -> bool {
        matches!(self, Self::SlidingWindow | Self::RowBased)
    }

    fn drafts<'e>(
        self,
        units: &[Unit<'e>],
        config: &ChunkingConfig,
    ) -> Result<Vec<Draft<'e>>, ProcessorError> {
        match self {
            Self::RowBased => row_based::drafts(units, config),
            Self::Hierarchical => hierarchical::drafts(units, config),
            Self::ColumnSemantic => column_semantic::drafts(units, config),
            Self::AdaptiveSmart => adaptive_smart::drafts(units, config),
            Self::EntityCentric => entity_centric::drafts(units, config),
            Self::SlidingWindow => sliding_window::drafts(units, config),
            Self::TopicClustering => topic_clustering::drafts(units, config),
            Self::StructureAwareHierarchical => structure_aware::drafts(units, config),
            Self::SemanticBlockFusion => block_fusion::drafts(units, config),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StrategyKind {
    type Err = UnknownStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| UnknownStrategyError(s.to_string()))
    }
}

/// A strategy bound to its configuration.
///
/// Built by a [`StrategyRegistry`](crate::StrategyRegistry); cheap to clone
/// and safe to share across tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    kind: StrategyKind,
    config: ChunkingConfig,
}

impl Strategy {
    /// Bind `kind` to `config`. The config's strategy id is set to the kind's id.
    #[must_use]
    pub fn new(kind: StrategyKind, config: ChunkingConfig) -> Self {
        Self {
            kind,
            config: ChunkingConfig {
                strategy_id: kind.id().to_string(),
                ..config
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    #[must_use]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    #[must_use]
    pub fn destination_key(&self) -> &str {
        &self.config.destination_key
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        self.kind.description()
    }

    /// Assemble one document's elements into chunks.
    ///
    /// Pure and deterministic apart from `created_at` and the timing fields:
    /// the same elements and config always give the same chunk ids and content.
    pub fn assemble(
        &self,
        document_id: &str,
        elements: &[Element],
    ) -> Result<ChunkingResult, ProcessorError> {
        let clock = Instant::now();
        let units = assembly::units(elements);
        let drafts = self.kind.drafts(&units, &self.config)?;
        let chunks = assembly::materialize(drafts, document_id, elements, &self.config)?;

        let elapsed = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut result = ChunkingResult::new(self.id(), chunks, elapsed);
        result
            .metadata
            .insert("document_id".to_string(), json!(document_id));
        result
            .metadata
            .insert("element_count".to_string(), json!(elements.len()));
        result
            .metadata
            .insert("supports_overlap".to_string(), json!(self.kind.supports_overlap()));

        debug!(
            "Assembled {} chunks from {} elements of {} with {}",
            result.total_chunks,
            elements.len(),
            document_id,
            self.id()
        );
        Ok(result)
    }
}
