//! Error types for chunkbench.
//!
//! Configuration and registry errors abort a benchmark before any work
//! starts. Processor, embedding, index and timeout errors are attributable to
//! a single strategy run and are recorded on that run instead of propagating.

use thiserror::Error;

use crate::types::BenchmarkRun;

/// Main error type for chunkbench operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration, caught before any run starts
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Strategy id not present in the registry
    #[error(transparent)]
    UnknownStrategy(#[from] UnknownStrategyError),

    /// A strategy failed while assembling chunks
    #[error("processor error: {0}")]
    Processor(#[from] ProcessorError),

    /// Embedding collaborator failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector index collaborator failed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// A run exceeded the benchmark deadline
    #[error("strategy '{strategy_id}' exceeded deadline of {deadline_ms}ms")]
    Timeout { strategy_id: String, deadline_ms: u64 },

    /// Every run of a benchmark batch failed
    #[error("all {} benchmark runs failed", .0.len())]
    AllRunsFailed(Vec<BenchmarkRun>),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Configuration defects detected by [`ChunkingConfig::validate`](crate::ChunkingConfig::validate)
/// and by benchmark setup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("strategy id must not be empty")]
    EmptyStrategyId,

    #[error("target_size must be greater than zero")]
    ZeroTargetSize,

    #[error("size ordering violated: min_size {min} <= target_size {target} <= max_size {max}")]
    SizeOrdering { min: usize, target: usize, max: usize },

    #[error("overlap {overlap} must be smaller than target_size {target}")]
    OverlapTooLarge { overlap: usize, target: usize },

    #[error("semantic_threshold {0} outside [0.0, 1.0]")]
    ThresholdOutOfRange(f32),

    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("no strategies requested")]
    NoStrategies,

    #[error("strategy '{0}' requested more than once")]
    DuplicateStrategy(String),

    #[error("destination key '{0}' is not unique within the session")]
    DuplicateDestination(String),
}

/// Requested strategy id is not registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown strategy: {0}")]
pub struct UnknownStrategyError(pub String);

/// Failure inside a strategy's assembly pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("strategy '{strategy_id}' requires custom parameter '{key}'")]
    MissingParam { strategy_id: String, key: String },

    #[error("strategy '{strategy_id}' has invalid custom parameter '{key}': {reason}")]
    InvalidParam {
        strategy_id: String,
        key: String,
        reason: String,
    },

    #[error("strategy '{strategy_id}' violated an assembly invariant: {detail}")]
    InvariantViolated { strategy_id: String, detail: String },
}

impl ProcessorError {
    /// Identifier of the strategy that raised the error.
    #[must_use]
    pub fn strategy_id(&self) -> &str {
        match self {
            Self::MissingParam { strategy_id, .. }
            | Self::InvalidParam { strategy_id, .. }
            | Self::InvariantViolated { strategy_id, .. } => strategy_id,
        }
    }
}

/// Embedding errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedder unavailable: {0}")]
    Unavailable(String),
}

/// Vector index errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("index initialization failed: {0}")]
    Init(String),

    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Result type alias for chunkbench operations.
pub type Result<T> = std::result::Result<T, Error>;
