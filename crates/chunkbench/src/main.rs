//! # chunkbench CLI
//!
//! Command-line interface for chunkbench, a document-chunking and
//! strategy-benchmarking engine.
//!
//! ## Commands
//!
//! - `chunkbench parse <FILE>` - Show the structural elements of a document
//! - `chunkbench chunk <FILE> --strategy <ID>` - Chunk a document with one strategy
//! - `chunkbench strategies` - List registered strategies
//! - `chunkbench bench <PATH>...` - Benchmark strategies over a corpus
//! - `chunkbench config show|init|path` - Inspect configuration
//!
//! ## Examples
//!
//! ```bash
//! # Compare three strategies over a docs folder
//! chunkbench bench docs/ --strategies hierarchical,sliding_window,adaptive_smart
//!
//! # Chunk one file and print relationships as JSON
//! chunkbench chunk README.md --strategy hierarchical --relationships --format json
//! ```

use anyhow::{bail, Context, Result};
use chunkbench_bench::{BenchmarkOrchestrator, BenchmarkReport, BenchmarkUpdate, RankKey};
use chunkbench_chunker::StrategyRegistry;
use chunkbench_core::{Chunk, Element, Error, Relationship};
use chunkbench_embed::EmbedderPool;
use chunkbench_graph::{ChunkGraph, InferenceConfig, RelationshipInferencer};
use chunkbench_store::MemoryIndex;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod corpus;

use config::{Config, RegistryName};

#[derive(Parser)]
#[command(name = "chunkbench")]
#[command(about = "Chunk documents and benchmark chunking strategies")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/chunkbench/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Size overrides shared by `chunk` and `bench`.
#[derive(clap::Args, Debug, Default)]
struct SizeArgs {
    /// Preferred chunk length in characters
    #[arg(long)]
    target_size: Option<usize>,

    /// Minimum chunk length in characters
    #[arg(long)]
    min_size: Option<usize>,

    /// Maximum chunk length in characters
    #[arg(long)]
    max_size: Option<usize>,

    /// Characters repeated between consecutive windows
    #[arg(long)]
    overlap: Option<usize>,

    /// Strategy parameter as KEY=VALUE; VALUE is read as JSON, else as a string
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a document into structural elements
    Parse {
        /// Document to parse
        file: PathBuf,
    },

    /// Chunk a document with one strategy
    Chunk {
        /// Document to chunk
        file: PathBuf,

        /// Strategy id (see `chunkbench strategies`)
        #[arg(short, long, default_value = "hierarchical")]
        strategy: String,

        #[command(flatten)]
        sizes: SizeArgs,

        /// Also infer relationships between the chunks
        #[arg(short, long)]
        relationships: bool,
    },

    /// List registered strategies
    Strategies {
        /// Registry to list; both when omitted
        #[arg(short, long)]
        registry: Option<RegistryName>,
    },

    /// Benchmark strategies over a corpus
    Bench {
        /// Files or directories making up the corpus
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Comma-separated strategy ids (default: config, else the whole registry)
        #[arg(short, long, value_delimiter = ',')]
        strategies: Vec<String>,

        /// Registry the strategies come from
        #[arg(long)]
        registry: Option<RegistryName>,

        /// Destination key prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Per-run deadline in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Probe query; repeat for more
        #[arg(short, long = "query")]
        queries: Vec<String>,

        /// Ranking key
        #[arg(long)]
        rank_by: Option<RankKey>,

        #[command(flatten)]
        sizes: SizeArgs,

        /// Write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for `chunk`.
#[derive(Serialize)]
struct ChunkOutput<'a> {
    strategy_id: &'a str,
    total_chunks: usize,
    avg_chunk_size: f64,
    chunks: &'a [Chunk],
    #[serde(skip_serializing_if = "Option::is_none")]
    relationships: Option<&'a [Relationship]>,
}

/// Output structure for `strategies`.
#[derive(Serialize)]
struct StrategyItem {
    id: String,
    registry: String,
    description: String,
}

fn registry(name: RegistryName) -> StrategyRegistry {
    match name {
        RegistryName::Benchmark => StrategyRegistry::benchmark(),
        RegistryName::Markdown => StrategyRegistry::markdown(),
    }
}

/// Registry that knows `strategy_id`, benchmark first.
fn registry_for(strategy_id: &str) -> StrategyRegistry {
    let benchmark = StrategyRegistry::benchmark();
    if benchmark.contains(strategy_id) {
        benchmark
    } else {
        StrategyRegistry::markdown()
    }
}

/// Fold command-line overrides into the configured chunking section.
fn apply_sizes(config: &mut Config, sizes: &SizeArgs) -> Result<()> {
    let chunking = &mut config.chunking;
    if let Some(v) = sizes.target_size {
        chunking.target_size = v;
    }
    if let Some(v) = sizes.min_size {
        chunking.min_size = v;
    }
    if let Some(v) = sizes.max_size {
        chunking.max_size = v;
    }
    if let Some(v) = sizes.overlap {
        chunking.overlap = v;
    }
    for param in &sizes.params {
        let (key, value) = param
            .split_once('=')
            .with_context(|| format!("Parameter '{param}' is not KEY=VALUE"))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        chunking.custom_params.insert(key.trim().to_string(), value);
    }
    Ok(())
}

fn setup_logging(verbose: bool, configured: &str) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        configured.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from file or CLI-specified path
    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(Some(path.clone()))
            .context(format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load().context("Failed to load config")?
    };

    setup_logging(cli.verbose, &config.logging.level)?;

    match cli.command {
        Commands::Parse { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let elements = chunkbench_parse::parse(&text);

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&elements)?);
                }
                OutputFormat::Text => {
                    println!("{} elements in {}\n", elements.len(), file.display());
                    for element in &elements {
                        print_element(element);
                    }
                }
            }
        }

        Commands::Chunk {
            file,
            strategy,
            sizes,
            relationships,
        } => {
            apply_sizes(&mut config, &sizes)?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document_id = file
                .file_name()
                .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().to_string());

            let chunking = config
                .chunking
                .to_config(&strategy, &config.benchmark.destination_prefix);
            chunking.validate().context("Invalid chunking configuration")?;

            let strategy = registry_for(&strategy)
                .create(chunking)
                .context("Failed to create strategy")?;
            let elements = chunkbench_parse::parse(&text);
            let result = strategy
                .assemble(&document_id, &elements)
                .context("Chunking failed")?;

            let edges = relationships.then(|| {
                let inference = InferenceConfig {
                    topic_similarity: config.benchmark.topic_similarity,
                    topic_threshold: config.benchmark.topic_threshold,
                    ..InferenceConfig::default()
                };
                RelationshipInferencer::new(inference).infer(&result.chunks)
            });

            match cli.format {
                OutputFormat::Json => {
                    let output = ChunkOutput {
                        strategy_id: &result.strategy_id,
                        total_chunks: result.total_chunks,
                        avg_chunk_size: result.avg_chunk_size,
                        chunks: &result.chunks,
                        relationships: edges.as_deref(),
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => {
                    println!(
                        "{}: {} chunks, avg {:.1} chars\n",
                        result.strategy_id, result.total_chunks, result.avg_chunk_size
                    );
                    for chunk in &result.chunks {
                        println!(
                            "#{} [{}] elements {}-{}, {} chars",
                            chunk.ordinal,
                            chunk.chunk_kind,
                            chunk.position_start,
                            chunk.position_end,
                            chunk.char_len()
                        );
                        println!("   {}", truncate(&chunk.content, 100));
                    }
                    if let Some(edges) = edges {
                        let graph = ChunkGraph::new(edges);
                        let counts = graph
                            .counts_by_kind()
                            .into_iter()
                            .map(|(kind, n)| format!("{kind:?} {n}"))
                            .collect::<Vec<_>>();
                        println!("\n{} relationships ({})", graph.len(), counts.join(", "));
                        for edge in graph.edges() {
                            let chunks = &result.chunks;
                            let source = chunks
                                .iter()
                                .position(|c| c.chunk_id == edge.source_chunk_id);
                            let target = chunks
                                .iter()
                                .position(|c| c.chunk_id == edge.target_chunk_id);
                            println!(
                                "   #{} -> #{} {:?} ({:.2})",
                                source.unwrap_or_default(),
                                target.unwrap_or_default(),
                                edge.relationship_kind,
                                edge.confidence
                            );
                        }
                    }
                }
            }
        }

        Commands::Strategies { registry: name } => {
            let names = match name {
                Some(name) => vec![name],
                None => vec![RegistryName::Benchmark, RegistryName::Markdown],
            };
            let items: Vec<StrategyItem> = names
                .into_iter()
                .flat_map(|name| {
                    let registry = registry(name);
                    registry
                        .list_available()
                        .into_iter()
                        .map(|id| StrategyItem {
                            description: registry.describe(&id),
                            registry: registry.name().to_string(),
                            id,
                        })
                        .collect::<Vec<_>>()
                })
                .collect();

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
                OutputFormat::Text => {
                    for item in &items {
                        println!("{:<30} [{}] {}", item.id, item.registry, item.description);
                    }
                }
            }
        }

        Commands::Bench {
            paths,
            strategies,
            registry: registry_name,
            prefix,
            deadline_ms,
            queries,
            rank_by,
            sizes,
            report,
        } => {
            apply_sizes(&mut config, &sizes)?;
            let bench_config = &mut config.benchmark;
            if let Some(name) = registry_name {
                bench_config.registry = name;
            }
            if let Some(prefix) = prefix {
                bench_config.destination_prefix = prefix;
            }
            if deadline_ms.is_some() {
                bench_config.deadline_ms = deadline_ms;
            }
            if !queries.is_empty() {
                bench_config.queries = queries;
            }
            if let Some(key) = rank_by {
                bench_config.rank_by = key;
            }

            let corpus = corpus::load_corpus(&paths).context("Failed to load corpus")?;
            let registry = Arc::new(registry(config.benchmark.registry));
            let strategy_ids = if !strategies.is_empty() {
                strategies
            } else if !config.benchmark.strategies.is_empty() {
                config.benchmark.strategies.clone()
            } else {
                registry.list_available()
            };

            let embedder = Arc::new(EmbedderPool::new(
                config.embedding.build(),
                config.embedding.max_concurrent,
            ));
            let index = Arc::new(MemoryIndex::new(embedder.dimension()));
            let base = config
                .chunking
                .to_config("benchmark", &config.benchmark.destination_prefix);

            let orchestrator = BenchmarkOrchestrator::new(
                registry,
                embedder,
                index,
                config.benchmark.to_benchmark_config(),
            );

            // Spawn progress reporter
            let mut updates = orchestrator.subscribe();
            let progress = tokio::spawn(async move {
                while let Ok(update) = updates.recv().await {
                    match update {
                        BenchmarkUpdate::RunFinished {
                            strategy_id,
                            chunks_produced,
                            processing_time_ms,
                        } => info!(
                            "Finished {}: {} chunks in {}ms",
                            strategy_id, chunks_produced, processing_time_ms
                        ),
                        BenchmarkUpdate::RunFailed { strategy_id, error } => {
                            warn!("Failed {}: {} ({})", strategy_id, error.message, error.kind);
                        }
                        BenchmarkUpdate::RunStarted { .. }
                        | BenchmarkUpdate::DocumentProcessed { .. } => {}
                    }
                }
            });

            // Dropping the benchmark future aborts every run still in flight.
            let outcome = tokio::select! {
                outcome = orchestrator.run_benchmark(&corpus, strategy_ids.as_slice(), &base) => outcome,
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to wait for Ctrl+C")?;
                    bail!("Benchmark interrupted");
                }
            };
            drop(orchestrator);
            let _ = progress.await;

            let (runs, all_failed) = match outcome {
                Ok(runs) => (runs, false),
                Err(Error::AllRunsFailed(runs)) => (runs, true),
                Err(e) => return Err(e).context("Benchmark could not start"),
            };

            let report_data = BenchmarkReport::new(corpus.len(), runs, config.benchmark.rank_by);
            if let Some(path) = report {
                tokio::fs::write(&path, report_data.to_json()?)
                    .await
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                info!("Report written to {}", path.display());
            }

            match cli.format {
                OutputFormat::Json => println!("{}", report_data.to_json()?),
                OutputFormat::Text => println!("{}", report_data.render_text()),
            }

            if all_failed {
                bail!("All {} benchmark runs failed", report_data.runs.len());
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&config)
                            .context("Failed to serialize config")?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{}",
                        toml::to_string_pretty(&config).context("Failed to serialize config")?
                    );
                }
            },
            ConfigAction::Init => {
                println!("{}", Config::sample_toml());
            }
            ConfigAction::Path => {
                if let Some(path) = Config::config_path() {
                    println!("{}", path.display());
                } else {
                    println!("Could not determine config directory");
                }
            }
        },
    }

    Ok(())
}

fn print_element(element: &Element) {
    let mut tags = Vec::new();
    if let Some(level) = element.level {
        tags.push(format!("level {level}"));
    }
    if let Some(language) = &element.language {
        tags.push(language.clone());
    }
    if let Some(url) = &element.url {
        tags.push(url.clone());
    }
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" ({})", tags.join(", "))
    };
    println!(
        "{:>4} {:<15}{} {}",
        element.position,
        element.kind.as_str(),
        tags,
        truncate(&element.content, 80)
    );
}

/// Truncate a string to max chars, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_len {
        s
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
