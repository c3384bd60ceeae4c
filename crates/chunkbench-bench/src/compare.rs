//! Ranking of benchmark runs.

use chunkbench_core::{BenchmarkRun, RunError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Built-in ranking keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    /// Fastest run first
    #[default]
    ProcessingTime,
    /// Most chunks first
    ChunksProduced,
    /// Smallest mean chunk first
    AvgChunkSize,
}

impl RankKey {
    pub const ALL: [RankKey; 3] = [
        RankKey::ProcessingTime,
        RankKey::ChunksProduced,
        RankKey::AvgChunkSize,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProcessingTime => "processing_time",
            Self::ChunksProduced => "chunks_produced",
            Self::AvgChunkSize => "avg_chunk_size",
        }
    }

    /// Ordering that puts the better run first.
    #[must_use]
    pub fn compare(self, a: &BenchmarkRun, b: &BenchmarkRun) -> Ordering {
        match self {
            Self::ProcessingTime => a.processing_time_ms.cmp(&b.processing_time_ms),
            Self::ChunksProduced => b.chunks_produced.cmp(&a.chunks_produced),
            Self::AvgChunkSize => a.avg_chunk_size.total_cmp(&b.avg_chunk_size),
        }
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RankKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown rank key '{s}'"))
    }
}

/// A run that made it into the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRun {
    /// 1-based
    pub rank: usize,
    pub strategy_id: String,
    pub destination_key: String,
    pub chunks_produced: usize,
    pub avg_chunk_size: f64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_top_score: Option<f32>,
}

/// Why a run was left out of the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnrankedReason {
    /// The run failed
    Failed { error: RunError },
    /// The run succeeded but produced nothing
    NoChunks,
}

impl fmt::Display for UnrankedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { error } => write!(f, "failed ({}): {}", error.kind, error.message),
            Self::NoChunks => f.write_str("produced no chunks"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrankedRun {
    pub strategy_id: String,
    #[serde(flatten)]
    pub reason: UnrankedReason,
}

/// Ranked view of one benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    /// Name of the key the ranking used
    pub ranked_by: String,
    pub ranked: Vec<RankedRun>,
    pub unranked: Vec<UnrankedRun>,
}

impl BenchmarkSummary {
    /// Top-ranked run, if any run was rankable.
    #[must_use]
    pub fn best(&self) -> Option<&RankedRun> {
        self.ranked.first()
    }
}

/// Rank runs by a built-in key.
///
/// Only successful runs with at least one chunk are ranked. Ties fall back
/// to lexical strategy id order, so the result is fully deterministic.
#[must_use]
pub fn compare(runs: &[BenchmarkRun], key: RankKey) -> BenchmarkSummary {
    summarize(runs, key.as_str(), |a, b| key.compare(a, b))
}

/// Rank runs with a caller-supplied ordering (better run first).
#[must_use]
pub fn compare_with<F>(runs: &[BenchmarkRun], comparator: F) -> BenchmarkSummary
where
    F: Fn(&BenchmarkRun, &BenchmarkRun) -> Ordering,
{
    summarize(runs, "custom", comparator)
}

fn summarize<F>(runs: &[BenchmarkRun], ranked_by: &str, comparator: F) -> BenchmarkSummary
where
    F: Fn(&BenchmarkRun, &BenchmarkRun) -> Ordering,
{
    let mut rankable = Vec::new();
    let mut unranked = Vec::new();

    for run in runs {
        match (&run.error, run.chunks_produced) {
            (Some(error), _) => unranked.push(UnrankedRun {
                strategy_id: run.strategy_id.clone(),
                reason: UnrankedReason::Failed {
                    error: error.clone(),
                },
            }),
            (None, 0) => unranked.push(UnrankedRun {
                strategy_id: run.strategy_id.clone(),
                reason: UnrankedReason::NoChunks,
            }),
            (None, _) => rankable.push(run),
        }
    }

    rankable.sort_by(|a, b| comparator(a, b).then_with(|| a.strategy_id.cmp(&b.strategy_id)));
    unranked.sort_by(|a, b| a.strategy_id.cmp(&b.strategy_id));

    let ranked = rankable
        .into_iter()
        .enumerate()
        .map(|(i, run)| RankedRun {
            rank: i + 1,
            strategy_id: run.strategy_id.clone(),
            destination_key: run.destination_key.clone(),
            chunks_produced: run.chunks_produced,
            avg_chunk_size: run.avg_chunk_size,
            processing_time_ms: run.processing_time_ms,
            avg_top_score: run.avg_top_score,
        })
        .collect();

    BenchmarkSummary {
        ranked_by: ranked_by.to_string(),
        ranked,
        unranked,
    }
}
