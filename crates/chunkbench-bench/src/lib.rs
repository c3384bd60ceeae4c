//! Strategy benchmarking for chunkbench.
//!
//! Runs several chunking strategies over the same corpus, indexes each
//! strategy's output into its own destination, and compares the results:
//! parse → assemble → infer → embed → index, once per strategy.
//!
//! # Components
//!
//! - [`BenchmarkOrchestrator`]: fans strategy runs out onto tokio tasks
//! - [`BenchmarkConfig`]: deadline, concurrency, probe queries, inference
//! - [`BenchmarkUpdate`]: progress events
//! - [`compare`] / [`compare_with`]: deterministic ranking of runs
//! - [`BenchmarkReport`]: runs plus summary, as JSON or text
//!
//! # Example
//!
//! ```rust,ignore
//! use chunkbench_bench::{BenchmarkConfig, BenchmarkOrchestrator, RankKey, compare};
//!
//! let bench = BenchmarkOrchestrator::new(registry, embedder, index, BenchmarkConfig::default());
//! let mut updates = bench.subscribe();
//!
//! let runs = bench
//!     .run_benchmark(&corpus, &["hierarchical", "sliding_window"], &base_config)
//!     .await?;
//! let summary = compare(&runs, RankKey::ProcessingTime);
//! ```

pub mod compare;
pub mod orchestrator;
pub mod report;

pub use compare::{
    compare, compare_with, BenchmarkSummary, RankKey, RankedRun, UnrankedReason, UnrankedRun,
};
pub use orchestrator::{BenchmarkConfig, BenchmarkOrchestrator, BenchmarkUpdate};
pub use report::BenchmarkReport;
