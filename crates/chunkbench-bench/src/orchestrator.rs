//! Main benchmark service.

use chunkbench_chunker::{Strategy, StrategyRegistry};
use chunkbench_core::{
    BenchmarkRun, Chunk, ChunkingConfig, CorpusDocument, Error, IndexRecord, PendingRun, Result,
    RunError, RunErrorKind, RunOutcome, ValidationError, VectorIndex,
};
use chunkbench_embed::EmbedderPool;
use chunkbench_graph::{InferenceConfig, RelationshipInferencer};
use chunkbench_parse::parse;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Benchmark progress events.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchmarkUpdate {
    RunStarted {
        strategy_id: String,
        destination_key: String,
    },
    DocumentProcessed {
        strategy_id: String,
        document_id: String,
        chunks: usize,
    },
    RunFinished {
        strategy_id: String,
        chunks_produced: usize,
        processing_time_ms: u64,
    },
    RunFailed {
        strategy_id: String,
        error: RunError,
    },
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Per-run deadline; runs still in flight when it passes are failed
    pub deadline: Option<Duration>,
    /// Maximum strategy runs executing at once
    pub max_concurrent: usize,
    /// Probe queries run against each destination after indexing
    pub queries: Vec<String>,
    /// Relationship inference settings; `None` skips inference
    pub inference: Option<InferenceConfig>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            max_concurrent: 4,
            queries: Vec::new(),
            inference: Some(InferenceConfig::default()),
        }
    }
}

/// Runs several chunking strategies over the same corpus.
///
/// Each strategy writes to its own destination key, so runs never need to
/// coordinate their writes. Embedder and index are injected; the
/// orchestrator owns no global state.
pub struct BenchmarkOrchestrator {
    /// Strategy lookup table, read-only once built
    registry: Arc<StrategyRegistry>,
    /// Shared embedder pool
    embedder: Arc<EmbedderPool>,
    /// Vector index shared by all runs
    index: Arc<dyn VectorIndex>,
    config: BenchmarkConfig,
    /// Update broadcast
    update_tx: broadcast::Sender<BenchmarkUpdate>,
}

impl BenchmarkOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        registry: Arc<StrategyRegistry>,
        embedder: Arc<EmbedderPool>,
        index: Arc<dyn VectorIndex>,
        config: BenchmarkConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        Self {
            registry,
            embedder,
            index,
            config,
            update_tx,
        }
    }

    /// Subscribe to benchmark updates.
    pub fn subscribe(&self) -> broadcast::Receiver<BenchmarkUpdate> {
        self.update_tx.subscribe()
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run every requested strategy over `corpus`.
    ///
    /// Configuration and registry problems fail the whole call before any
    /// run starts. After that, failures are recorded on the affected run and
    /// siblings carry on. Runs come back in the order they were requested.
    /// If no run succeeds the call fails with [`Error::AllRunsFailed`], which
    /// still carries every run.
    pub async fn run_benchmark<S: AsRef<str>>(
        &self,
        corpus: &[CorpusDocument],
        strategy_ids: &[S],
        base_config: &ChunkingConfig,
    ) -> Result<Vec<BenchmarkRun>> {
        let strategies = self.plan(strategy_ids, base_config)?;
        self.index.init().await?;

        info!(
            "Benchmarking {} strategies over {} documents",
            strategies.len(),
            corpus.len()
        );

        let corpus: Arc<[CorpusDocument]> = corpus.into();
        let queries: Arc<[String]> = self.config.queries.clone().into();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut tasks = JoinSet::new();

        for (slot, strategy) in strategies.iter().cloned().enumerate() {
            let run = StrategyRun {
                strategy,
                embedder: Arc::clone(&self.embedder),
                index: Arc::clone(&self.index),
                inferencer: self.config.inference.map(RelationshipInferencer::new),
                queries: Arc::clone(&queries),
                deadline: self.config.deadline,
                update_tx: self.update_tx.clone(),
            };
            let corpus = Arc::clone(&corpus);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (slot, run.execute(&corpus).await)
            });
        }

        let mut slots: Vec<Option<BenchmarkRun>> = vec![None; strategies.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, run)) => slots[slot] = Some(run),
                Err(e) => error!("Benchmark task failed: {e}"),
            }
        }

        // A task that panicked still gets a run record.
        let runs: Vec<BenchmarkRun> = slots
            .into_iter()
            .zip(&strategies)
            .map(|(run, strategy)| {
                run.unwrap_or_else(|| {
                    PendingRun::start(strategy.id(), strategy.destination_key()).fail(RunError {
                        kind: RunErrorKind::Internal,
                        message: "run task aborted".to_string(),
                    })
                })
            })
            .collect();

        let succeeded = runs.iter().filter(|r| r.is_success()).count();
        info!(
            "Benchmark finished: {} of {} runs succeeded",
            succeeded,
            runs.len()
        );

        if succeeded == 0 {
            return Err(Error::AllRunsFailed(runs));
        }
        Ok(runs)
    }

    /// Resolve and validate every requested strategy up front.
    fn plan<S: AsRef<str>>(
        &self,
        strategy_ids: &[S],
        base_config: &ChunkingConfig,
    ) -> Result<Vec<Strategy>> {
        if strategy_ids.is_empty() {
            return Err(ValidationError::NoStrategies.into());
        }

        let mut ids = HashSet::new();
        let mut destinations = HashSet::new();
        let mut strategies = Vec::with_capacity(strategy_ids.len());

        for id in strategy_ids {
            let id = id.as_ref();
            if !ids.insert(id) {
                return Err(ValidationError::DuplicateStrategy(id.to_string()).into());
            }

            let config = base_config.for_strategy(id);
            config.validate()?;
            if !destinations.insert(config.destination_key.clone()) {
                return Err(ValidationError::DuplicateDestination(config.destination_key).into());
            }

            strategies.push(self.registry.create(config)?);
        }

        debug!(
            "Planned runs: {:?}",
            strategies.iter().map(Strategy::id).collect::<Vec<_>>()
        );
        Ok(strategies)
    }
}

/// Everything one strategy run owns.
struct StrategyRun {
    strategy: Strategy,
    embedder: Arc<EmbedderPool>,
    index: Arc<dyn VectorIndex>,
    inferencer: Option<RelationshipInferencer>,
    queries: Arc<[String]>,
    deadline: Option<Duration>,
    update_tx: broadcast::Sender<BenchmarkUpdate>,
}

impl StrategyRun {
    /// Run to completion and finalize the record exactly once.
    async fn execute(self, corpus: &[CorpusDocument]) -> BenchmarkRun {
        let strategy_id = self.strategy.id();
        let pending = PendingRun::start(strategy_id, self.strategy.destination_key());

        info!(
            "Starting {} run into {}",
            strategy_id,
            self.strategy.destination_key()
        );
        let _ = self.update_tx.send(BenchmarkUpdate::RunStarted {
            strategy_id: strategy_id.to_string(),
            destination_key: self.strategy.destination_key().to_string(),
        });

        // The deadline can only fire at collaborator calls; assembly never yields.
        // Writes made before it fires stay in the destination.
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.process(corpus))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Timeout {
                        strategy_id: strategy_id.to_string(),
                        deadline_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => self.process(corpus).await,
        };

        match result {
            Ok(outcome) => {
                let run = pending.succeed(outcome);
                info!(
                    "Run {} produced {} chunks in {}ms",
                    strategy_id, run.chunks_produced, run.processing_time_ms
                );
                let _ = self.update_tx.send(BenchmarkUpdate::RunFinished {
                    strategy_id: strategy_id.to_string(),
                    chunks_produced: run.chunks_produced,
                    processing_time_ms: run.processing_time_ms,
                });
                run
            }
            Err(err) => {
                let error = RunError::from(&err);
                warn!("Run {} failed: {}", strategy_id, err);
                let _ = self.update_tx.send(BenchmarkUpdate::RunFailed {
                    strategy_id: strategy_id.to_string(),
                    error: error.clone(),
                });
                pending.fail(error)
            }
        }
    }

    /// Parse → assemble → infer → embed → write, document by document.
    async fn process(&self, corpus: &[CorpusDocument]) -> Result<RunOutcome> {
        let destination = self.strategy.destination_key();
        let batch_size = self.strategy.config().batch_size.max(1);
        let mut outcome = RunOutcome::default();

        for document in corpus {
            let elements = parse(&document.text);
            let result = self.strategy.assemble(&document.document_id, &elements)?;

            if let Some(inferencer) = &self.inferencer {
                outcome.relationships_found += inferencer.infer(&result.chunks).len();
            }

            for batch in result.chunks.chunks(batch_size) {
                let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
                let embeddings = self.embedder.embed_batch(&texts).await?;
                let records = batch
                    .iter()
                    .zip(embeddings)
                    .map(|(chunk, output)| IndexRecord {
                        chunk_id: chunk.chunk_id,
                        vector: output.embedding,
                        payload: payload(chunk),
                    })
                    .collect();
                self.index.upsert_batch(destination, records).await?;
            }

            outcome.documents_processed += 1;
            outcome.chunks_produced += result.total_chunks;
            outcome.total_chunk_chars += result.chunks.iter().map(Chunk::char_len).sum::<usize>();

            debug!(
                "{}: {} chunks from {}",
                self.strategy.id(),
                result.total_chunks,
                document.document_id
            );
            let _ = self.update_tx.send(BenchmarkUpdate::DocumentProcessed {
                strategy_id: self.strategy.id().to_string(),
                document_id: document.document_id.clone(),
                chunks: result.total_chunks,
            });
        }

        if outcome.chunks_produced > 0 {
            outcome.avg_top_score = self.probe(destination).await?;
        }
        Ok(outcome)
    }

    /// Mean best score of the probe queries against `destination`.
    async fn probe(&self, destination: &str) -> Result<Option<f32>> {
        if self.queries.is_empty() {
            return Ok(None);
        }

        let mut total = 0.0;
        for query in self.queries.iter() {
            let embedded = self.embedder.embed_query(query).await?;
            let matches = self.index.query(destination, &embedded.embedding, 1).await?;
            total += matches.first().map_or(0.0, |m| m.score);
        }
        Ok(Some(total / self.queries.len() as f32))
    }
}

/// Index payload stored beside each chunk vector.
fn payload(chunk: &Chunk) -> serde_json::Value {
    json!({
        "document_id": chunk.document_id,
        "strategy_id": chunk.strategy_id,
        "ordinal": chunk.ordinal,
        "chunk_kind": chunk.chunk_kind,
        "content": chunk.content,
        "position_start": chunk.position_start,
        "position_end": chunk.position_end,
        "word_count": chunk.word_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chunkbench_core::{IndexError, IndexMatch};
    use chunkbench_embed::HashEmbedder;
    use chunkbench_store::MemoryIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIM: usize = 32;

    fn corpus() -> Vec<CorpusDocument> {
        vec![
            CorpusDocument::new(
                "guide.md",
                "# Guide\n\nChunking splits documents.\n\n## Usage\n\nRun the benchmark with several strategies.\n\n```sh\nchunkbench bench docs/\n```",
            ),
            CorpusDocument::new(
                "table.md",
                "| name | value |\n|---|---|\n| alpha | 1 |\n| beta | 2 |\n| gamma | 3 |",
            ),
        ]
    }

    fn base() -> ChunkingConfig {
        ChunkingConfig {
            destination_key: "bench".to_string(),
            min_size: 0,
            target_size: 60,
            max_size: 120,
            ..ChunkingConfig::default()
        }
    }

    fn orchestrator(index: Arc<dyn VectorIndex>, config: BenchmarkConfig) -> BenchmarkOrchestrator {
        BenchmarkOrchestrator::new(
            Arc::new(StrategyRegistry::benchmark()),
            Arc::new(EmbedderPool::new(Arc::new(HashEmbedder::with_dimension(DIM)), 2)),
            index,
            config,
        )
    }

    /// Index whose writes always fail.
    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn init(&self) -> std::result::Result<(), IndexError> {
            Ok(())
        }

        async fn upsert(
            &self,
            _destination_key: &str,
            _chunk_id: uuid::Uuid,
            _vector: Vec<f32>,
            _payload: serde_json::Value,
        ) -> std::result::Result<(), IndexError> {
            Err(IndexError::Upsert("disk full".to_string()))
        }

        async fn query(
            &self,
            _destination_key: &str,
            _vector: &[f32],
            _limit: usize,
        ) -> std::result::Result<Vec<IndexMatch>, IndexError> {
            Ok(Vec::new())
        }

        async fn count(&self, _destination_key: &str) -> std::result::Result<usize, IndexError> {
            Ok(0)
        }

        async fn destinations(&self) -> std::result::Result<Vec<String>, IndexError> {
            Ok(Vec::new())
        }
    }

    /// Index that stalls on writes to one destination.
    struct SlowIndex {
        inner: MemoryIndex,
        slow_destination: String,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl VectorIndex for SlowIndex {
        async fn init(&self) -> std::result::Result<(), IndexError> {
            self.inner.init().await
        }

        async fn upsert(
            &self,
            destination_key: &str,
            chunk_id: uuid::Uuid,
            vector: Vec<f32>,
            payload: serde_json::Value,
        ) -> std::result::Result<(), IndexError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if destination_key == self.slow_destination {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            self.inner
                .upsert(destination_key, chunk_id, vector, payload)
                .await
        }

        async fn query(
            &self,
            destination_key: &str,
            vector: &[f32],
            limit: usize,
        ) -> std::result::Result<Vec<IndexMatch>, IndexError> {
            self.inner.query(destination_key, vector, limit).await
        }

        async fn count(&self, destination_key: &str) -> std::result::Result<usize, IndexError> {
            self.inner.count(destination_key).await
        }

        async fn destinations(&self) -> std::result::Result<Vec<String>, IndexError> {
            self.inner.destinations().await
        }
    }

    #[tokio::test]
    async fn test_runs_in_requested_order_with_isolated_destinations() {
        let index = Arc::new(MemoryIndex::new(DIM));
        let bench = orchestrator(index.clone(), BenchmarkConfig::default());

        let runs = bench
            .run_benchmark(&corpus(), &["sliding_window", "hierarchical", "row_based"], &base())
            .await
            .unwrap();

        let ids: Vec<&str> = runs.iter().map(|r| r.strategy_id.as_str()).collect();
        assert_eq!(ids, vec!["sliding_window", "hierarchical", "row_based"]);
        for run in &runs {
            assert!(run.is_success(), "{:?}", run.error);
            assert_eq!(run.destination_key, format!("bench_{}", run.strategy_id));
            assert_eq!(run.documents_processed, 2);
            assert!(run.chunks_produced > 0);
            assert_eq!(
                index.count(&run.destination_key).await.unwrap(),
                run.chunks_produced
            );
        }
        assert_eq!(index.destinations().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_processor_failure_is_isolated() {
        let bench = orchestrator(Arc::new(MemoryIndex::new(DIM)), BenchmarkConfig::default());
        let runs = bench
            .run_benchmark(
                &corpus(),
                &["hierarchical", "entity_centric", "sliding_window"],
                &base(),
            )
            .await
            .unwrap();

        assert_eq!(runs.len(), 3);
        assert!(runs[0].is_success());
        assert!(runs[2].is_success());
        let error = runs[1].error.as_ref().unwrap();
        assert_eq!(error.kind, RunErrorKind::Processor);
        assert!(error.message.contains("entities"));
        assert_eq!(runs[1].chunks_produced, 0);
    }

    #[tokio::test]
    async fn test_all_runs_failed() {
        let bench = orchestrator(Arc::new(FailingIndex), BenchmarkConfig::default());
        let err = bench
            .run_benchmark(&corpus(), &["hierarchical", "row_based"], &base())
            .await
            .unwrap_err();

        match err {
            Error::AllRunsFailed(runs) => {
                assert_eq!(runs.len(), 2);
                assert!(runs
                    .iter()
                    .all(|r| r.error.as_ref().map(|e| e.kind) == Some(RunErrorKind::Index)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_strategy_aborts_before_work() {
        let index = Arc::new(MemoryIndex::new(DIM));
        let bench = orchestrator(index.clone(), BenchmarkConfig::default());
        let err = bench
            .run_benchmark(&corpus(), &["hierarchical", "nope"], &base())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownStrategy(_)));
        assert!(!index.is_initialized().await);
        assert!(index.destinations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let bench = orchestrator(Arc::new(MemoryIndex::new(DIM)), BenchmarkConfig::default());

        let none: [&str; 0] = [];
        let err = bench.run_benchmark(&corpus(), &none, &base()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::NoStrategies)));

        let err = bench
            .run_benchmark(&corpus(), &["row_based", "row_based"], &base())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DuplicateStrategy(_))
        ));

        let bad = ChunkingConfig {
            overlap: 60,
            ..base()
        };
        let err = bench
            .run_benchmark(&corpus(), &["sliding_window"], &bad)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::OverlapTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_marks_run_failed() {
        let index = Arc::new(SlowIndex {
            inner: MemoryIndex::new(DIM),
            slow_destination: "bench_hierarchical".to_string(),
            writes: AtomicUsize::new(0),
        });
        let config = BenchmarkConfig {
            deadline: Some(Duration::from_millis(200)),
            ..BenchmarkConfig::default()
        };
        let bench = orchestrator(index.clone(), config);

        let runs = bench
            .run_benchmark(&corpus(), &["hierarchical", "row_based"], &base())
            .await
            .unwrap();

        let error = runs[0].error.as_ref().unwrap();
        assert_eq!(error.kind, RunErrorKind::Timeout);
        assert!(error.message.contains("200ms"));
        assert!(runs[1].is_success());
        assert!(index.writes.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_probe_queries_and_relationships() {
        let config = BenchmarkConfig {
            queries: vec!["run the benchmark".to_string()],
            ..BenchmarkConfig::default()
        };
        let bench = orchestrator(Arc::new(MemoryIndex::new(DIM)), config);
        let runs = bench
            .run_benchmark(&corpus(), &["hierarchical"], &base())
            .await
            .unwrap();

        let score = runs[0].avg_top_score.unwrap();
        assert!(score > 0.0 && score <= 1.0 + 1e-5);
        assert!(runs[0].relationships_found > 0);
    }

    #[tokio::test]
    async fn test_updates_are_broadcast() {
        let bench = orchestrator(Arc::new(MemoryIndex::new(DIM)), BenchmarkConfig::default());
        let mut updates = bench.subscribe();

        bench
            .run_benchmark(&corpus(), &["row_based"], &base())
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(update) = updates.try_recv() {
            seen.push(update);
        }
        assert!(matches!(seen.first(), Some(BenchmarkUpdate::RunStarted { .. })));
        assert!(matches!(seen.last(), Some(BenchmarkUpdate::RunFinished { .. })));
        let documents = seen
            .iter()
            .filter(|u| matches!(u, BenchmarkUpdate::DocumentProcessed { .. }))
            .count();
        assert_eq!(documents, 2);
    }
}
