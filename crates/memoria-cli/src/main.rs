//! memoria CLI
//!
//! Command-line composition root for the memoria multi-modal retrieval core: wires up
//! configuration, the embedding/caption providers, the three-store index manager, the
//! ingestion pipeline, and the retriever registry, then exposes them as subcommands.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use memoria_core::embeddings::JinaEmbeddingAdapter;
use memoria_core::caption::QwenLikeCaptionProvider;
use memoria_core::{
    register_default_strategies, Config, HttpMemoSource, IndexManager, IngestionPipeline, Memo,
    Query, RebuildManager, RetrieverRegistry, StrategyParams,
};

/// memoria - multi-modal hybrid retrieval core for memos
#[derive(Parser)]
#[command(name = "memoria")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the memoria memo retrieval core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest memos from a JSON file (an array of memo objects).
    Ingest {
        /// Path to a JSON file containing an array of memos.
        file: PathBuf,
    },

    /// Search the index with one of the ten retrieval strategies.
    Search {
        /// Query text.
        query: String,
        /// Strategy name (text, image, vector, hybrid, bm25, rrf, weighted, bm25_vector,
        /// bm25_vector_alpha, adaptive).
        #[arg(long, default_value = "hybrid")]
        strategy: String,
        /// Maximum results to return.
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Minimum score to keep a result.
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,
        /// Metadata filter as `key=value`, may be repeated.
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Extra strategy parameter as `key=value` (e.g. `alpha=0.7`), may be repeated.
        #[arg(long = "param")]
        params: Vec<String>,
    },

    /// Show index status (node counts, BM25 readiness).
    Status,

    /// Re-ingest every memo for one creator from the configured upstream memo source.
    Rebuild {
        /// Creator identifier (e.g. `users/1`).
        creator: String,
    },
}

fn parse_key_value_pairs(pairs: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected key=value, got {pair:?}"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let embedding = Arc::new(JinaEmbeddingAdapter::new(
        config.jina_api_key.clone().unwrap_or_default(),
        config.jina_text_model.clone(),
        config.jina_image_model.clone(),
    ));
    let index = Arc::new(IndexManager::new(&config, embedding)?);

    match cli.command {
        Commands::Ingest { file } => run_ingest(&config, index, file).await,
        Commands::Search { query, strategy, top_k, min_score, filters, params } => {
            run_search(index, query, strategy, top_k, min_score, filters, params).await
        }
        Commands::Status => run_status(index).await,
        Commands::Rebuild { creator } => run_rebuild(&config, index, creator).await,
    }
}

const DEFAULT_QWEN_ENDPOINT: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

fn caption_provider(config: &Config) -> Option<Arc<QwenLikeCaptionProvider>> {
    if !config.use_image_caption {
        return None;
    }
    Some(Arc::new(QwenLikeCaptionProvider::new(
        DEFAULT_QWEN_ENDPOINT,
        config.image_caption_model.clone(),
        config.jina_api_key.clone(),
    )))
}

async fn run_ingest(config: &Config, index: Arc<IndexManager>, file: PathBuf) -> anyhow::Result<()> {
    println!("{}", "=== memoria Ingest ===".cyan().bold());
    println!();

    let body = std::fs::read_to_string(&file)?;
    let memos: Vec<Memo> = serde_json::from_str(&body)?;
    println!("{}: {}", "Memos found".white().bold(), memos.len());

    let pipeline = IngestionPipeline::new(index, config, caption_provider(config).map(|p| p as _), reqwest::Client::new());

    let mut ingested = 0;
    let mut failed = 0;
    for memo in &memos {
        match pipeline.ingest(memo).await {
            Ok(outcome) => {
                ingested += 1;
                println!(
                    "  {} {} (text={}, image={})",
                    "OK".green(),
                    memo.uid(),
                    outcome.text_nodes,
                    outcome.image_nodes
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "FAIL".red(), memo.uid(), e);
            }
        }
    }

    println!();
    println!(
        "{}",
        format!("Ingest complete: {ingested}/{} memos indexed ({failed} failed)", memos.len()).green().bold()
    );
    Ok(())
}

async fn run_search(
    index: Arc<IndexManager>,
    query_text: String,
    strategy_name: String,
    top_k: usize,
    min_score: f32,
    filters: Vec<String>,
    params: Vec<String>,
) -> anyhow::Result<()> {
    let registry = RetrieverRegistry::new();
    register_default_strategies(&registry);

    let strategy_params: StrategyParams = parse_key_value_pairs(&params)?;
    let retriever = registry.get(&strategy_name, index, &strategy_params)?;

    let mut query = Query::new(query_text, top_k).with_min_score(min_score);
    for (key, value) in parse_key_value_pairs(&filters)? {
        query = query.with_filter(key, value);
    }

    let results = retriever.retrieve(&query).await?;

    println!("{}", format!("=== memoria Search ({strategy_name}) ===").cyan().bold());
    println!();
    if results.is_empty() {
        println!("{}", "No results.".dimmed());
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{} {} {} {}",
            format!("{}.", rank + 1).white().bold(),
            format!("[{:.4}]", result.score).yellow(),
            result.memo_uid.cyan(),
            result.source.dimmed()
        );
        println!("   {}", truncate(&result.content, 100).dimmed());
    }
    Ok(())
}

async fn run_status(index: Arc<IndexManager>) -> anyhow::Result<()> {
    let status = index.status().await;
    println!("{}", "=== memoria Index Status ===".cyan().bold());
    println!();
    println!("{}: {}", "Memos".white().bold(), status.memo_count);
    println!("{}: {}", "Text nodes".white().bold(), status.text_node_count);
    println!("{}: {}", "Image nodes".white().bold(), status.image_node_count);
    println!(
        "{}: {}",
        "BM25".white().bold(),
        if status.bm25_ready {
            if status.bm25_stale { "ready (stale)".yellow().to_string() } else { "ready".green().to_string() }
        } else {
            "not built".red().to_string()
        }
    );
    println!("{}: {}", "Text collection".white().bold(), status.text_collection_name);
    println!("{}: {}", "Image collection".white().bold(), status.image_collection_name);
    println!("{}: {}", "Index directory".white().bold(), status.index_base_dir.display());
    Ok(())
}

async fn run_rebuild(config: &Config, index: Arc<IndexManager>, creator: String) -> anyhow::Result<()> {
    println!("{}", "=== memoria Rebuild ===".cyan().bold());
    println!();

    let base_url = config
        .memos_base_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("MEMORIA_MEMOS_BASE_URL is not configured"))?;
    let source = Arc::new(HttpMemoSource::new(base_url, config.memos_session_cookie.clone(), reqwest::Client::new()));
    let pipeline = Arc::new(IngestionPipeline::new(index, config, caption_provider(config).map(|p| p as _), reqwest::Client::new()));
    let manager = RebuildManager::new(source, pipeline);

    let status = manager.rebuild(&creator).await?;
    println!("{}: {:?}", "State".white().bold(), status.state);
    println!("{}: {}", "Memos seen".white().bold(), status.memos_seen);
    println!("{}: {}", "Memos indexed".white().bold(), status.memos_indexed);
    println!("{}: {}", "Memos failed".white().bold(), status.memos_failed);
    if let Some(error) = status.error {
        println!("{}: {}", "Error".red().bold(), error);
    }
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
