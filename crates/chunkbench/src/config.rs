//! Configuration handling for chunkbench.
//!
//! Loaded from `config.toml` in the platform config directory, or from a
//! path given with `--config`. Every field has a default, so a missing file
//! or a partial file is fine.

use anyhow::{Context, Result};
use chunkbench_bench::{BenchmarkConfig, RankKey};
use chunkbench_core::{ChunkingConfig, Embedder, Metadata};
use chunkbench_embed::{EmbeddingCache, HashEmbedder, NoopEmbedder};
use chunkbench_graph::InferenceConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Chunk assembly parameters
    #[serde(default)]
    pub chunking: ChunkingSection,

    /// Benchmark orchestration
    #[serde(default)]
    pub benchmark: BenchmarkSection,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Every chunking field except the strategy id, which comes from the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSection {
    pub target_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub overlap: usize,
    pub separator: String,
    pub semantic_threshold: f32,
    pub use_metadata: bool,
    pub batch_size: usize,
    /// Strategy-specific parameters, e.g. `entities = ["Rust"]`
    pub custom_params: Metadata,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        let defaults = ChunkingConfig::default();
        Self {
            target_size: defaults.target_size,
            min_size: defaults.min_size,
            max_size: defaults.max_size,
            overlap: defaults.overlap,
            separator: defaults.separator,
            semantic_threshold: defaults.semantic_threshold,
            use_metadata: defaults.use_metadata,
            batch_size: defaults.batch_size,
            custom_params: defaults.custom_params,
        }
    }
}

impl ChunkingSection {
    /// Chunking config for one strategy writing under `destination_key`.
    pub fn to_config(&self, strategy_id: &str, destination_key: &str) -> ChunkingConfig {
        ChunkingConfig {
            strategy_id: strategy_id.to_string(),
            destination_key: destination_key.to_string(),
            target_size: self.target_size,
            overlap: self.overlap,
            min_size: self.min_size,
            max_size: self.max_size,
            separator: self.separator.clone(),
            semantic_threshold: self.semantic_threshold,
            use_metadata: self.use_metadata,
            batch_size: self.batch_size,
            custom_params: self.custom_params.clone(),
        }
    }
}

/// Which strategy table a command draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RegistryName {
    #[default]
    Benchmark,
    Markdown,
}

/// Benchmark orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSection {
    /// Destinations are named `{prefix}_{strategy_id}`
    pub destination_prefix: String,
    /// Per-run deadline in milliseconds; unset means no deadline
    pub deadline_ms: Option<u64>,
    pub max_concurrent: usize,
    pub registry: RegistryName,
    /// Strategy ids to run; empty means every id in the registry
    pub strategies: Vec<String>,
    /// Probe queries run against every destination
    pub queries: Vec<String>,
    pub infer_relationships: bool,
    pub topic_similarity: bool,
    pub topic_threshold: f32,
    pub rank_by: RankKey,
}

impl Default for BenchmarkSection {
    fn default() -> Self {
        let inference = InferenceConfig::default();
        Self {
            destination_prefix: "bench".to_string(),
            deadline_ms: None,
            max_concurrent: 4,
            registry: RegistryName::default(),
            strategies: Vec::new(),
            queries: Vec::new(),
            infer_relationships: true,
            topic_similarity: inference.topic_similarity,
            topic_threshold: inference.topic_threshold,
            rank_by: RankKey::default(),
        }
    }
}

impl BenchmarkSection {
    pub fn to_benchmark_config(&self) -> BenchmarkConfig {
        let inference = self.infer_relationships.then(|| InferenceConfig {
            topic_similarity: self.topic_similarity,
            topic_threshold: self.topic_threshold,
            ..InferenceConfig::default()
        });
        BenchmarkConfig {
            deadline: self.deadline_ms.map(Duration::from_millis),
            max_concurrent: self.max_concurrent,
            queries: self.queries.clone(),
            inference,
        }
    }
}

/// Offline embedders available to the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Feature-hashing bag of words
    #[default]
    Hash,
    /// Zero vectors; measures chunking and indexing only
    Noop,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub provider: EmbeddingProvider,
    pub dimension: usize,
    /// Max concurrent embedding calls across all runs
    pub max_concurrent: usize,
    /// Cached embeddings; 0 disables the cache
    pub cache_size: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            dimension: chunkbench_embed::DEFAULT_DIMENSION,
            max_concurrent: 4,
            cache_size: 10_000,
        }
    }
}

impl EmbeddingSection {
    pub fn build(&self) -> Arc<dyn Embedder> {
        let embedder: Arc<dyn Embedder> = match self.provider {
            EmbeddingProvider::Hash => Arc::new(HashEmbedder::with_dimension(self.dimension)),
            EmbeddingProvider::Noop => Arc::new(NoopEmbedder::with_dimension(self.dimension)),
        };
        if self.cache_size == 0 {
            embedder
        } else {
            Arc::new(EmbeddingCache::with_capacity(embedder, self.cache_size))
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const SAMPLE_TOML: &str = r#"# chunkbench configuration

[chunking]
target_size = 1000
min_size = 100
max_size = 2000
overlap = 0
separator = "\n\n"
semantic_threshold = 0.5
use_metadata = true
batch_size = 32

# Strategy-specific parameters
[chunking.custom_params]
entities = ["Rust", "Tokio"]
rows_per_chunk = 10

[benchmark]
destination_prefix = "bench"
# deadline_ms = 30000
max_concurrent = 4
registry = "benchmark"
strategies = []
queries = ["how do I configure chunk sizes"]
infer_relationships = true
topic_similarity = false
topic_threshold = 0.5
rank_by = "processing_time"

[embedding]
provider = "hash"
dimension = 384
max_concurrent = 4
cache_size = 10000

[logging]
level = "info"
"#;

impl Config {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let Some(path) = path.or_else(Self::config_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::read(&path)
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Path of `config.toml` in the config directory.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Commented sample configuration.
    pub fn sample_toml() -> &'static str {
        SAMPLE_TOML
    }
}

/// Get the config directory for chunkbench.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CHUNKBENCH_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "chunkbench").map(|dirs| dirs.config_dir().to_path_buf())
}
