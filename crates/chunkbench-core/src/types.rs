//! Core types for chunkbench.
//!
//! ## Document Structure
//! - [`Element`]: one typed structural unit of a parsed document
//! - [`ElementKind`]: the closed set of element kinds
//! - [`CorpusDocument`]: a `(document_id, raw_text)` pair supplied by the caller
//!
//! ## Chunk Assembly
//! - [`ChunkingConfig`]: per-run assembly parameters
//! - [`Chunk`]: the unit indexed and retrieved
//! - [`StructuralMetadata`]: position span and element-kind histogram
//! - [`ChunkingResult`]: one strategy's output over one document
//!
//! ## Relationships
//! - [`Relationship`]: directed edge between two chunks
//! - [`RelationshipKind`]: hierarchy, cross reference, code context, topic similarity
//!
//! ## Benchmarking
//! - [`PendingRun`]: an in-flight run, consumed exactly once on finalization
//! - [`BenchmarkRun`]: the finalized, immutable run record
//! - [`RunError`]: failure detail carried by a failed run
//!
//! ## Collaborator Payloads
//! - [`EmbeddingOutput`]: result of embedding one text
//! - [`IndexMatch`]: one ranked match returned by a vector index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, ValidationError};

/// Open string-keyed metadata map. Ordered so serialized output is stable.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// ============================================================================
// Elements
// ============================================================================

/// Kind of a structural element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Header,
    Paragraph,
    CodeBlock,
    InlineCode,
    List,
    ListItem,
    Table,
    TableRow,
    Blockquote,
    Link,
    Image,
    HorizontalRule,
    LineBreak,
    Emphasis,
    Strong,
}

impl ElementKind {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Paragraph => "paragraph",
            Self::CodeBlock => "code_block",
            Self::InlineCode => "inline_code",
            Self::List => "list",
            Self::ListItem => "list_item",
            Self::Table => "table",
            Self::TableRow => "table_row",
            Self::Blockquote => "blockquote",
            Self::Link => "link",
            Self::Image => "image",
            Self::HorizontalRule => "horizontal_rule",
            Self::LineBreak => "line_break",
            Self::Emphasis => "emphasis",
            Self::Strong => "strong",
        }
    }

    /// Zero-content separators. Strategies may drop these.
    #[must_use]
    pub fn is_separator(self) -> bool {
        matches!(self, Self::HorizontalRule | Self::LineBreak)
    }

    /// Elements that must never be split across chunks by a
    /// structure-respecting strategy.
    #[must_use]
    pub fn is_atomic(self) -> bool {
        matches!(self, Self::Table | Self::CodeBlock)
    }

    /// Block-level kinds. Every other kind is a child that follows its
    /// enclosing block in document order.
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Self::Header
                | Self::Paragraph
                | Self::CodeBlock
                | Self::List
                | Self::Table
                | Self::Blockquote
                | Self::HorizontalRule
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered or unordered list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// One structurally distinct unit of a source document.
///
/// Elements are immutable once produced by the parser. Parent/child structure
/// is positional: children (list items, table rows, inline spans) follow their
/// parent block directly and carry no pointer back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Element kind
    pub kind: ElementKind,
    /// Raw source text
    pub content: String,
    /// Strictly increasing ordinal, unique per document
    pub position: usize,
    /// Byte offset of the element's source text
    pub byte_offset: usize,
    /// Header depth, or nesting depth for list items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Code fence info string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Link or image target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    /// List marker kind for lists and list items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_kind: Option<ListKind>,
}

impl Element {
    /// Create an element with no optional attributes.
    pub fn new(kind: ElementKind, content: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            content: content.into(),
            position,
            byte_offset: 0,
            level: None,
            language: None,
            url: None,
            alt_text: None,
            list_kind: None,
        }
    }

    #[must_use]
    pub fn at_offset(mut self, byte_offset: usize) -> Self {
        self.byte_offset = byte_offset;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_alt_text(mut self, alt_text: impl Into<String>) -> Self {
        self.alt_text = Some(alt_text.into());
        self
    }

    #[must_use]
    pub fn with_list_kind(mut self, list_kind: ListKind) -> Self {
        self.list_kind = Some(list_kind);
        self
    }

    /// Content length in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Heading text without markup, for header elements.
    ///
    /// `"## Getting Started ##"` and `"Getting Started\n---"` both yield
    /// `"Getting Started"`.
    #[must_use]
    pub fn header_text(&self) -> Option<String> {
        if self.kind != ElementKind::Header {
            return None;
        }
        let first_line = self.content.lines().next().unwrap_or_default().trim();
        let text = first_line
            .trim_start_matches('#')
            .trim_end_matches('#')
            .trim();
        Some(text.to_string())
    }
}

/// One document of a benchmark corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub document_id: String,
    pub text: String,
}

impl CorpusDocument {
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            text: text.into(),
        }
    }
}

// ============================================================================
// Chunking configuration
// ============================================================================

/// Per-run chunking parameters.
///
/// Constructed once per benchmark run or call and read-only during execution.
/// Sizes are measured in chars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Registered strategy identifier
    pub strategy_id: String,
    /// Namespace chunks are written to; a prefix when used as a base config
    pub destination_key: String,
    /// Preferred chunk length
    pub target_size: usize,
    /// Characters repeated between consecutive windows
    pub overlap: usize,
    /// Chunks shorter than this are merged with a neighbour
    pub min_size: usize,
    /// Hard upper bound on chunk length, except for oversized atomic elements
    pub max_size: usize,
    /// Joins element text inside a chunk
    pub separator: String,
    /// Similarity cut-off for similarity-driven strategies
    pub semantic_threshold: f32,
    /// Attach derived semantic metadata to chunks
    pub use_metadata: bool,
    /// Embedding batch size when writing chunks
    pub batch_size: usize,
    /// Strategy-specific parameters
    #[serde(default)]
    pub custom_params: Metadata,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy_id: "hierarchical".to_string(),
            destination_key: "chunks".to_string(),
            target_size: 1000,
            overlap: 0,
            min_size: 100,
            max_size: 2000,
            separator: "\n\n".to_string(),
            semantic_threshold: 0.5,
            use_metadata: true,
            batch_size: 32,
            custom_params: Metadata::new(),
        }
    }
}

impl ChunkingConfig {
    /// Default configuration for one strategy.
    pub fn new(strategy_id: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            ..Default::default()
        }
    }

    /// Check the size, overlap and threshold invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.strategy_id.trim().is_empty() {
            return Err(ValidationError::EmptyStrategyId);
        }
        if self.target_size == 0 {
            return Err(ValidationError::ZeroTargetSize);
        }
        if self.min_size > self.target_size || self.target_size > self.max_size {
            return Err(ValidationError::SizeOrdering {
                min: self.min_size,
                target: self.target_size,
                max: self.max_size,
            });
        }
        if self.overlap >= self.target_size {
            return Err(ValidationError::OverlapTooLarge {
                overlap: self.overlap,
                target: self.target_size,
            });
        }
        if !(0.0..=1.0).contains(&self.semantic_threshold) {
            return Err(ValidationError::ThresholdOutOfRange(self.semantic_threshold));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::ZeroBatchSize);
        }
        Ok(())
    }

    /// Clone this configuration for another strategy.
    ///
    /// Only the strategy id and the destination key change; the destination
    /// becomes `"{prefix}_{strategy_id}"` where the prefix is this config's
    /// destination key.
    #[must_use]
    pub fn for_strategy(&self, strategy_id: &str) -> Self {
        Self {
            strategy_id: strategy_id.to_string(),
            destination_key: format!("{}_{}", self.destination_key, strategy_id),
            ..self.clone()
        }
    }

    /// Look up a custom parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.custom_params.get(key)
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.custom_params.insert(key.to_string(), value);
        self
    }
}

// ============================================================================
// Chunks
// ============================================================================

/// Structural facts about a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralMetadata {
    /// Number of contributing elements
    pub element_count: usize,
    /// Contributing elements per kind
    pub kind_histogram: BTreeMap<ElementKind, usize>,
    /// Header texts enclosing the chunk's first element, outermost first
    pub header_path: Vec<String>,
}

/// A chunk of document content produced by one strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Derived from document id, strategy id and ordinal
    pub chunk_id: Uuid,
    pub document_id: String,
    pub strategy_id: String,
    /// Position of the chunk in its document's output (0-indexed)
    pub ordinal: u32,
    pub content: String,
    /// Contributing elements in document order, never empty
    pub elements: Vec<Element>,
    /// Strategy-defined tag, e.g. "section" or "table-block"
    pub chunk_kind: String,
    pub structural_metadata: StructuralMetadata,
    pub semantic_metadata: Metadata,
    pub position_start: usize,
    pub position_end: usize,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Deterministic chunk id, unique across strategies run on one document.
    #[must_use]
    pub fn derive_id(document_id: &str, strategy_id: &str, ordinal: u32) -> Uuid {
        let name = format!("{document_id}\u{1f}{strategy_id}\u{1f}{ordinal}");
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
    }

    /// Content length in chars.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// First contributing element.
    #[must_use]
    pub fn leading_element(&self) -> Option<&Element> {
        self.elements.first()
    }

    /// Whether any contributing element has the given kind.
    #[must_use]
    pub fn contains_kind(&self, kind: ElementKind) -> bool {
        self.elements.iter().any(|e| e.kind == kind)
    }

    /// Texts of all header elements in the chunk.
    pub fn header_texts(&self) -> impl Iterator<Item = String> + '_ {
        self.elements.iter().filter_map(Element::header_text)
    }
}

/// Output of one strategy over one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingResult {
    pub chunks: Vec<Chunk>,
    pub strategy_id: String,
    pub total_chunks: usize,
    /// Mean chunk length in chars
    pub avg_chunk_size: f64,
    pub metadata: Metadata,
    pub processing_time_ms: u64,
}

impl ChunkingResult {
    pub fn new(strategy_id: impl Into<String>, chunks: Vec<Chunk>, processing_time_ms: u64) -> Self {
        let total_chunks = chunks.len();
        let total_chars: usize = chunks.iter().map(Chunk::char_len).sum();
        let avg_chunk_size = if total_chunks == 0 {
            0.0
        } else {
            total_chars as f64 / total_chunks as f64
        };
        Self {
            chunks,
            strategy_id: strategy_id.into(),
            total_chunks,
            avg_chunk_size,
            metadata: Metadata::new(),
            processing_time_ms,
        }
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// Kind of inferred relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Hierarchy,
    CrossReference,
    CodeContext,
    TopicSimilarity,
}

/// Directed edge between two chunks of the same assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_chunk_id: Uuid,
    pub target_chunk_id: Uuid,
    pub relationship_kind: RelationshipKind,
    /// In `[0.0, 1.0]`; 1.0 for structurally certain edges
    pub confidence: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

// ============================================================================
// Benchmark runs
// ============================================================================

/// Category of a run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunErrorKind {
    Processor,
    Embedding,
    Index,
    Timeout,
    Internal,
}

impl fmt::Display for RunErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processor => "processor",
            Self::Embedding => "embedding",
            Self::Index => "index",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Failure detail recorded on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: RunErrorKind,
    pub message: String,
}

impl From<&Error> for RunError {
    fn from(err: &Error) -> Self {
        let kind = match err {
            Error::Processor(_) => RunErrorKind::Processor,
            Error::Embedding(_) => RunErrorKind::Embedding,
            Error::Index(_) => RunErrorKind::Index,
            Error::Timeout { .. } => RunErrorKind::Timeout,
            _ => RunErrorKind::Internal,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Counters gathered by a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub documents_processed: usize,
    pub chunks_produced: usize,
    pub total_chunk_chars: usize,
    pub relationships_found: usize,
    pub avg_top_score: Option<f32>,
}

/// A run that has started but not been finalized.
///
/// Finalizing consumes the value, so a run is finalized exactly once.
#[derive(Debug)]
pub struct PendingRun {
    strategy_id: String,
    destination_key: String,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl PendingRun {
    pub fn start(strategy_id: impl Into<String>, destination_key: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            destination_key: destination_key.into(),
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    #[must_use]
    pub fn strategy_id(&self) -> &str {
        &self.strategy_id
    }

    #[must_use]
    pub fn destination_key(&self) -> &str {
        &self.destination_key
    }

    /// Finalize as a success.
    #[must_use]
    pub fn succeed(self, outcome: RunOutcome) -> BenchmarkRun {
        let avg_chunk_size = if outcome.chunks_produced == 0 {
            0.0
        } else {
            outcome.total_chunk_chars as f64 / outcome.chunks_produced as f64
        };
        BenchmarkRun {
            strategy_id: self.strategy_id,
            destination_key: self.destination_key,
            documents_processed: outcome.documents_processed,
            chunks_produced: outcome.chunks_produced,
            avg_chunk_size,
            relationships_found: outcome.relationships_found,
            avg_top_score: outcome.avg_top_score,
            processing_time_ms: elapsed_ms(self.clock),
            started_at: self.started_at,
            finished_at: Utc::now(),
            error: None,
        }
    }

    /// Finalize as a failure.
    #[must_use]
    pub fn fail(self, error: RunError) -> BenchmarkRun {
        BenchmarkRun {
            strategy_id: self.strategy_id,
            destination_key: self.destination_key,
            documents_processed: 0,
            chunks_produced: 0,
            avg_chunk_size: 0.0,
            relationships_found: 0,
            avg_top_score: None,
            processing_time_ms: elapsed_ms(self.clock),
            started_at: self.started_at,
            finished_at: Utc::now(),
            error: Some(error),
        }
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// One strategy's execution record over one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub strategy_id: String,
    /// Unique within a benchmark session
    pub destination_key: String,
    pub documents_processed: usize,
    pub chunks_produced: usize,
    /// Mean chunk length in chars
    pub avg_chunk_size: f64,
    pub relationships_found: usize,
    /// Mean best similarity over probe queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_top_score: Option<f32>,
    pub processing_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Present iff the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl BenchmarkRun {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

// ============================================================================
// Collaborator payloads
// ============================================================================

/// Output from embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Number of tokens in input
    pub token_count: usize,
}

/// One ranked vector index match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub chunk_id: Uuid,
    pub score: f32,
    pub payload: serde_json::Value,
}
