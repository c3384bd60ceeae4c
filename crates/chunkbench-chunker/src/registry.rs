//! Strategy registries.
//!
//! A registry maps strategy ids to constructors. It is populated once at
//! startup and read-only afterwards, so it can be shared behind an `Arc`
//! without locking. Two registries ship with the crate: [`StrategyRegistry::benchmark`]
//! for the general pipeline and [`StrategyRegistry::markdown`] for the
//! markdown-specific strategies.

use chunkbench_core::{ChunkingConfig, UnknownStrategyError};
use std::collections::BTreeMap;
use tracing::debug;

use crate::strategy::{Strategy, StrategyKind};

/// Builds a strategy from its configuration.
pub type Constructor = fn(ChunkingConfig) -> Strategy;

/// Registry of chunking strategies.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    name: String,
    /// Constructors by strategy id, sorted for deterministic listing
    constructors: BTreeMap<String, Constructor>,
}

impl StrategyRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: BTreeMap::new(),
        }
    }

    /// Constructor for one of the built-in strategies.
    #[must_use]
    pub fn constructor(kind: StrategyKind) -> Constructor {
        match kind {
            StrategyKind::RowBased => |c| Strategy::new(StrategyKind::RowBased, c),
            StrategyKind::Hierarchical => |c| Strategy::new(StrategyKind::Hierarchical, c),
            StrategyKind::ColumnSemantic => |c| Strategy::new(StrategyKind::ColumnSemantic, c),
            StrategyKind::AdaptiveSmart => |c| Strategy::new(StrategyKind::AdaptiveSmart, c),
            StrategyKind::EntityCentric => |c| Strategy::new(StrategyKind::EntityCentric, c),
            StrategyKind::SlidingWindow => |c| Strategy::new(StrategyKind::SlidingWindow, c),
            StrategyKind::TopicClustering => |c| Strategy::new(StrategyKind::TopicClustering, c),
            StrategyKind::StructureAwareHierarchical => {
                |c| Strategy::new(StrategyKind::StructureAwareHierarchical, c)
            }
            StrategyKind::SemanticBlockFusion => {
                |c| Strategy::new(StrategyKind::SemanticBlockFusion, c)
            }
        }
    }

    fn with_kinds(name: &str, kinds: &[StrategyKind]) -> Self {
        let mut registry = Self::new(name);
        for kind in kinds {
            registry.register(kind.id(), Self::constructor(*kind));
        }
        registry
    }

    /// Registry of the general benchmark strategies.
    #[must_use]
    pub fn benchmark() -> Self {
        Self::with_kinds("benchmark", &StrategyKind::BENCHMARK)
    }

    /// Registry of the markdown-specific strategies.
    #[must_use]
    pub fn markdown() -> Self {
        Self::with_kinds("markdown", &StrategyKind::MARKDOWN)
    }

    /// Registry name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a constructor under `id`, replacing any previous one.
    pub fn register(&mut self, id: &str, constructor: Constructor) {
        debug!("Registering strategy {} in {} registry", id, self.name);
        self.constructors.insert(id.to_string(), constructor);
    }

    /// Instantiate the strategy named by `config.strategy_id`.
    pub fn create(&self, config: ChunkingConfig) -> Result<Strategy, UnknownStrategyError> {
        let constructor = self
            .constructors
            .get(&config.strategy_id)
            .ok_or_else(|| UnknownStrategyError(config.strategy_id.clone()))?;
        Ok(constructor(config))
    }

    /// Registered ids in lexical order.
    #[must_use]
    pub fn list_available(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Self-description of a strategy.
    ///
    /// Builds a throwaway instance from a placeholder config to read its
    /// description. Unregistered ids yield `"Unknown strategy: <id>"`.
    #[must_use]
    pub fn describe(&self, id: &str) -> String {
        match self.create(ChunkingConfig::new(id)) {
            Ok(strategy) => strategy.description().to_string(),
            Err(err) => err.to_string(),
        }
    }

    /// One strategy per registered id, each with a copy of `base`.
    ///
    /// Only the strategy id and destination key differ between the copies
    /// (see [`ChunkingConfig::for_strategy`]).
    #[must_use]
    pub fn create_all(&self, base: &ChunkingConfig) -> Vec<Strategy> {
        self.constructors
            .iter()
            .map(|(id, constructor)| constructor(base.for_strategy(id)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::benchmark()
    }
}
