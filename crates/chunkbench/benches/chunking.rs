//! Benchmarks for parsing and chunk assembly.
//!
//! Measures throughput of the structural parser and of every registered
//! strategy over the same generated document.

use chunkbench_chunker::StrategyRegistry;
use chunkbench_core::ChunkingConfig;
use chunkbench_graph::RelationshipInferencer;
use chunkbench_parse::parse;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Sample document content for benchmarking.
const SAMPLE_DOC: &str = r#"
# Introduction to Chunking

Chunking splits a document into pieces small enough to embed while keeping
related text together. See [Strategies](#strategies) for the options.

## Strategies

### Hierarchical

Hierarchical chunking follows the header tree, one section per chunk.

### Sliding Window

A fixed window moves over the text with a configurable overlap.

```rust
let config = ChunkingConfig::new("sliding_window");
```

## Comparison

| strategy | keeps structure | overlap |
|---|---|---|
| hierarchical | yes | no |
| sliding_window | no | yes |

- Entity-centric groups paragraphs by the entities they mention
- Topic clustering groups paragraphs by vocabulary
  - Both ignore document order

---

Choosing a strategy depends on the corpus and on the queries it must answer.
"#;

/// Generate test content of specified size (in KB).
fn generate_content(size_kb: usize) -> String {
    let repetitions = (size_kb * 1024) / SAMPLE_DOC.len() + 1;
    SAMPLE_DOC.repeat(repetitions)
}

fn base_config() -> ChunkingConfig {
    ChunkingConfig::default()
        .with_param("entities", serde_json::json!(["strategy", "chunking"]))
}

fn parsing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");

    for size_kb in [1, 10, 100] {
        let content = generate_content(size_kb);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("parse", format!("{size_kb}kb")),
            &content,
            |b, text| b.iter(|| black_box(parse(text))),
        );
    }

    group.finish();
}

fn assembly_benchmark(c: &mut Criterion) {
    let registry = StrategyRegistry::benchmark();
    let content = generate_content(50);
    let elements = parse(&content);

    let mut group = c.benchmark_group("assembly");
    group.throughput(Throughput::Bytes(content.len() as u64));

    for strategy in registry.create_all(&base_config()) {
        group.bench_with_input(
            BenchmarkId::new("strategy", strategy.id()),
            &elements,
            |b, elements| b.iter(|| black_box(strategy.assemble("bench.md", elements))),
        );
    }

    group.finish();
}

fn inference_benchmark(c: &mut Criterion) {
    let registry = StrategyRegistry::benchmark();
    let content = generate_content(10);
    let elements = parse(&content);
    let inferencer = RelationshipInferencer::default();

    let mut group = c.benchmark_group("inference");

    for id in ["hierarchical", "adaptive_smart"] {
        let Ok(strategy) = registry.create(base_config().for_strategy(id)) else {
            continue;
        };
        let Ok(result) = strategy.assemble("bench.md", &elements) else {
            continue;
        };
        group.throughput(Throughput::Elements(result.chunks.len() as u64));
        group.bench_with_input(BenchmarkId::new("infer", id), &result.chunks, |b, chunks| {
            b.iter(|| black_box(inferencer.infer(chunks)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    parsing_benchmark,
    assembly_benchmark,
    inference_benchmark
);
criterion_main!(benches);
