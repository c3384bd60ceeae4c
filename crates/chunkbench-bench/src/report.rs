//! Benchmark reports.

use chrono::{DateTime, Utc};
use chunkbench_core::BenchmarkRun;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::compare::{compare, BenchmarkSummary, RankKey};

/// Every requested run plus the ranked summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_at: DateTime<Utc>,
    pub documents: usize,
    /// In requested order, failed runs included
    pub runs: Vec<BenchmarkRun>,
    pub summary: BenchmarkSummary,
}

impl BenchmarkReport {
    #[must_use]
    pub fn new(documents: usize, runs: Vec<BenchmarkRun>, key: RankKey) -> Self {
        let summary = compare(&runs, key);
        Self {
            generated_at: Utc::now(),
            documents,
            runs,
            summary,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.len() - self.succeeded()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text table for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} runs over {} documents ({} succeeded, {} failed)",
            self.runs.len(),
            self.documents,
            self.succeeded(),
            self.failed()
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<4} {:<30} {:>8} {:>10} {:>10} {:>8}",
            "rank", "strategy", "chunks", "avg size", "time ms", "score"
        );
        for ranked in &self.summary.ranked {
            let score = ranked
                .avg_top_score
                .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
            let _ = writeln!(
                out,
                "{:<4} {:<30} {:>8} {:>10.1} {:>10} {:>8}",
                ranked.rank,
                ranked.strategy_id,
                ranked.chunks_produced,
                ranked.avg_chunk_size,
                ranked.processing_time_ms,
                score
            );
        }
        for unranked in &self.summary.unranked {
            let _ = writeln!(out, "{:<4} {:<30} {}", "-", unranked.strategy_id, unranked.reason);
        }
        let _ = writeln!(out);
        let _ = write!(out, "ranked by {}", self.summary.ranked_by);
        out
    }
}
