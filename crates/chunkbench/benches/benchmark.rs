//! Benchmarks for full strategy runs.
//!
//! Measures the orchestrator end to end against the in-memory index, with
//! the zero-vector embedder isolating chunking and indexing cost from the
//! cost of the hashing embedder.

use chunkbench_bench::{BenchmarkConfig, BenchmarkOrchestrator};
use chunkbench_chunker::StrategyRegistry;
use chunkbench_core::{ChunkingConfig, CorpusDocument, Embedder};
use chunkbench_embed::{EmbedderPool, HashEmbedder, NoopEmbedder};
use chunkbench_store::MemoryIndex;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

const DIM: usize = 384;

const SECTION: &str = "## Section\n\nTokio tasks run each strategy. Rust keeps the runs apart.\n\n```rust\nlet runs = bench.run_benchmark(&corpus, &ids, &config).await?;\n```\n\nSee [Section](#section) again.\n\n";

/// Corpus of `docs` documents of roughly `size_kb` each.
fn generate_corpus(docs: usize, size_kb: usize) -> Vec<CorpusDocument> {
    let body = SECTION.repeat((size_kb * 1024) / SECTION.len() + 1);
    (0..docs)
        .map(|i| CorpusDocument::new(format!("doc_{i}.md"), format!("# Document {i}\n\n{body}")))
        .collect()
}

fn orchestrator(embedder: Arc<dyn Embedder>) -> BenchmarkOrchestrator {
    BenchmarkOrchestrator::new(
        Arc::new(StrategyRegistry::benchmark()),
        Arc::new(EmbedderPool::new(embedder, 4)),
        Arc::new(MemoryIndex::new(DIM)),
        BenchmarkConfig {
            queries: vec!["how are runs kept apart".to_string()],
            ..BenchmarkConfig::default()
        },
    )
}

fn base_config() -> ChunkingConfig {
    ChunkingConfig {
        destination_key: "bench".to_string(),
        ..ChunkingConfig::default()
    }
    .with_param("entities", serde_json::json!(["Tokio", "Rust"]))
}

fn single_strategy_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bench = orchestrator(Arc::new(NoopEmbedder::with_dimension(DIM)));
    let config = base_config();

    let mut group = c.benchmark_group("single_strategy");
    group.sample_size(20);

    for doc_count in [1, 10] {
        let corpus = generate_corpus(doc_count, 10);
        group.throughput(Throughput::Elements(doc_count as u64));
        group.bench_with_input(
            BenchmarkId::new("hierarchical", format!("{doc_count}_docs")),
            &corpus,
            |b, corpus| {
                b.to_async(&rt).iter(|| async {
                    black_box(
                        bench
                            .run_benchmark(corpus, &["hierarchical"], &config)
                            .await,
                    )
                });
            },
        );
    }

    group.finish();
}

fn all_strategies_benchmark(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let corpus = generate_corpus(5, 10);
    let config = base_config();
    let ids: Vec<String> = StrategyRegistry::benchmark().list_available();

    let mut group = c.benchmark_group("all_strategies");
    group.sample_size(10);

    let embedders: [(&str, Arc<dyn Embedder>); 2] = [
        ("noop", Arc::new(NoopEmbedder::with_dimension(DIM))),
        ("feature-hash", Arc::new(HashEmbedder::with_dimension(DIM))),
    ];
    for (name, embedder) in embedders {
        let bench = orchestrator(embedder);
        group.bench_function(BenchmarkId::new("embedder", name), |b| {
            b.to_async(&rt).iter(|| async {
                black_box(
                    bench
                        .run_benchmark(&corpus, ids.as_slice(), &config)
                        .await,
                )
            });
        });
    }

    group.finish();
}

criterion_group!(benches, single_strategy_benchmark, all_strategies_benchmark);
criterion_main!(benches);
