//! Integration tests for the full chunkbench pipeline.
//!
//! Tests the complete flow: parse → assemble → infer → embed → index → compare.

use async_trait::async_trait;
use chunkbench_bench::{
    compare, BenchmarkConfig, BenchmarkOrchestrator, BenchmarkReport, RankKey, UnrankedReason,
};
use chunkbench_chunker::{StrategyKind, StrategyRegistry};
use chunkbench_core::{
    ChunkingConfig, CorpusDocument, EmbedError, Embedder, EmbeddingOutput, Error, RelationshipKind,
    RunErrorKind, VectorIndex,
};
use chunkbench_embed::{EmbedderPool, EmbeddingCache, HashEmbedder};
use chunkbench_graph::RelationshipInferencer;
use chunkbench_parse::parse;
use chunkbench_store::MemoryIndex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

const TEST_DIM: usize = 64;

const GUIDE: &str = "# Getting Started\n\nchunkbench compares chunking strategies.\n\n## Install\n\nInstall it with cargo.\n\n```sh\ncargo install chunkbench\n```\n\n## Usage\n\nSee [Install](#install) first, then run a benchmark.\n\n| strategy | speed |\n|---|---|\n| hierarchical | fast |\n| sliding_window | fast |";

const NOTES: &str = "Release notes\n=============\n\nVersion one adds the sliding window strategy.\n\n- faster parsing\n- smaller chunks\n  - nested item\n\n---\n\nVersion two adds topic clustering.";

/// Embedder that fails on every call.
struct BrokenEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn model_name(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> usize {
        TEST_DIM
    }

    async fn embed_text(&self, _texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbedError::Unavailable("model not loaded".to_string()))
    }
}

fn corpus() -> Vec<CorpusDocument> {
    vec![
        CorpusDocument::new("guide.md", GUIDE),
        CorpusDocument::new("notes.md", NOTES),
    ]
}

fn base_config() -> ChunkingConfig {
    ChunkingConfig {
        destination_key: "it".to_string(),
        min_size: 20,
        target_size: 120,
        max_size: 240,
        ..ChunkingConfig::default()
    }
    .with_param("entities", serde_json::json!(["chunkbench", "cargo"]))
}

fn orchestrator(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> BenchmarkOrchestrator {
    BenchmarkOrchestrator::new(
        Arc::new(StrategyRegistry::benchmark()),
        Arc::new(EmbedderPool::new(embedder, 4)),
        index,
        BenchmarkConfig {
            queries: vec!["install with cargo".to_string()],
            ..BenchmarkConfig::default()
        },
    )
}

#[tokio::test]
async fn test_full_benchmark_over_every_strategy() {
    let index = Arc::new(MemoryIndex::new(TEST_DIM));
    let bench = orchestrator(Arc::new(HashEmbedder::with_dimension(TEST_DIM)), index.clone());
    let ids: Vec<&str> = StrategyKind::BENCHMARK.iter().map(|k| k.id()).collect();

    let runs = bench
        .run_benchmark(&corpus(), ids.as_slice(), &base_config())
        .await
        .unwrap();

    assert_eq!(runs.len(), ids.len());
    for (run, id) in runs.iter().zip(&ids) {
        assert_eq!(run.strategy_id, *id);
        assert!(run.is_success(), "{id}: {:?}", run.error);
        assert_eq!(run.documents_processed, 2);
        assert!(run.chunks_produced > 0, "{id}");
        assert!(run.avg_top_score.is_some());
        assert!(run.started_at <= run.finished_at);
        assert_eq!(
            index.count(&run.destination_key).await.unwrap(),
            run.chunks_produced
        );
    }

    let summary = compare(&runs, RankKey::ProcessingTime);
    assert_eq!(summary.ranked.len(), ids.len());
    assert!(summary.unranked.is_empty());
    let times: Vec<u64> = summary.ranked.iter().map(|r| r.processing_time_ms).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_partial_failure_is_a_valid_result() {
    let bench = orchestrator(
        Arc::new(HashEmbedder::with_dimension(TEST_DIM)),
        Arc::new(MemoryIndex::new(TEST_DIM)),
    );
    let base = ChunkingConfig {
        custom_params: Default::default(),
        ..base_config()
    };

    let runs = bench
        .run_benchmark(
            &corpus(),
            &["hierarchical", "entity_centric", "sliding_window"],
            &base,
        )
        .await
        .unwrap();

    assert_eq!(runs.len(), 3);
    assert!(runs[0].error.is_none() && runs[0].chunks_produced > 0);
    assert!(runs[2].error.is_none() && runs[2].chunks_produced > 0);
    assert_eq!(
        runs[1].error.as_ref().map(|e| e.kind),
        Some(RunErrorKind::Processor)
    );

    let report = BenchmarkReport::new(2, runs, RankKey::default());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.summary.unranked.len(), 1);
    assert!(matches!(
        report.summary.unranked[0].reason,
        UnrankedReason::Failed { .. }
    ));
}

#[tokio::test]
async fn test_embedding_failure_fails_every_run() {
    let broken = Arc::new(BrokenEmbedder {
        calls: AtomicUsize::new(0),
    });
    let bench = orchestrator(broken.clone(), Arc::new(MemoryIndex::new(TEST_DIM)));

    let err = bench
        .run_benchmark(&corpus(), &["row_based", "adaptive_smart"], &base_config())
        .await
        .unwrap_err();

    let Error::AllRunsFailed(runs) = err else {
        panic!("expected AllRunsFailed");
    };
    assert_eq!(runs.len(), 2);
    for run in &runs {
        let error = run.error.as_ref().unwrap();
        assert_eq!(error.kind, RunErrorKind::Embedding);
        assert!(error.message.contains("model not loaded"));
    }
    assert!(broken.calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_cached_embedder_reuses_identical_chunks() {
    let cache = Arc::new(EmbeddingCache::new(Arc::new(HashEmbedder::with_dimension(
        TEST_DIM,
    ))));
    let bench = orchestrator(cache.clone(), Arc::new(MemoryIndex::new(TEST_DIM)));

    let first = bench
        .run_benchmark(&corpus(), &["hierarchical"], &base_config())
        .await
        .unwrap();
    let misses = cache.stats().await.misses;
    assert_eq!(misses, first[0].chunks_produced as u64);

    // Same strategy again: every chunk text is already cached.
    bench
        .run_benchmark(&corpus(), &["hierarchical"], &base_config())
        .await
        .unwrap();
    let stats = cache.stats().await;
    assert_eq!(stats.misses, misses);
    assert_eq!(stats.hits, misses);
}

#[test]
fn test_header_example_produces_hierarchy_edge() {
    let registry = StrategyRegistry::benchmark();
    let config = ChunkingConfig {
        min_size: 10,
        target_size: 100,
        max_size: 200,
        ..ChunkingConfig::new("hierarchical")
    };
    let strategy = registry.create(config).unwrap();
    let elements = parse("# Title\n\nSome text.\n\n## Sub\n\nMore text.");
    let result = strategy.assemble("doc", &elements).unwrap();

    assert_eq!(result.total_chunks, 2);
    assert_eq!(result.chunks[0].content, "# Title\n\nSome text.");
    assert_eq!(result.chunks[1].content, "## Sub\n\nMore text.");

    let edges = RelationshipInferencer::default().infer(&result.chunks);
    let hierarchy: Vec<_> = edges
        .iter()
        .filter(|e| e.relationship_kind == RelationshipKind::Hierarchy)
        .collect();
    assert_eq!(hierarchy.len(), 1);
    assert_eq!(hierarchy[0].source_chunk_id, result.chunks[0].chunk_id);
    assert_eq!(hierarchy[0].target_chunk_id, result.chunks[1].chunk_id);
    assert_eq!(hierarchy[0].confidence, 1.0);
}

#[test]
fn test_markdown_registry_strategies() {
    let registry = StrategyRegistry::markdown();
    let base = ChunkingConfig {
        min_size: 0,
        target_size: 80,
        max_size: 160,
        ..ChunkingConfig::default()
    };
    let elements = parse(GUIDE);

    for strategy in registry.create_all(&base) {
        let result = strategy.assemble("guide.md", &elements).unwrap();
        assert!(result.total_chunks > 0, "{}", strategy.id());
        for chunk in &result.chunks {
            assert!(chunk.position_start <= chunk.position_end);
            assert!(!chunk.elements.is_empty());
        }
    }
}

#[tokio::test]
async fn test_report_written_to_disk() {
    let dir = tempdir().unwrap();
    let bench = orchestrator(
        Arc::new(HashEmbedder::with_dimension(TEST_DIM)),
        Arc::new(MemoryIndex::new(TEST_DIM)),
    );
    let runs = bench
        .run_benchmark(&corpus(), &["row_based"], &base_config())
        .await
        .unwrap();

    let report = BenchmarkReport::new(2, runs, RankKey::ChunksProduced);
    let path = dir.path().join("report.json");
    std::fs::write(&path, report.to_json().unwrap()).unwrap();

    let loaded: BenchmarkReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.runs.len(), 1);
    assert_eq!(loaded.summary.ranked_by, "chunks_produced");
    assert_eq!(loaded.summary.ranked[0].strategy_id, "row_based");
}
