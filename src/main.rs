mod api;
mod catalog;
mod config;
mod embed;
mod engine;
mod error;
mod explain;
mod index;
mod retrieve;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use api::protocol::RecommendedAssessment;
use config::Config;
use engine::Engine;

#[derive(Parser)]
#[command(
    name = "appraise",
    version,
    about = "Assessment recommendation engine — semantic retrieval over a product catalog"
)]
struct Cli {
    /// Directory holding the config, catalog, and embedding cache
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the storage directory
    Init,
    /// Load the catalog and compute any missing embeddings
    Build,
    /// Rank catalog entries against a free-text query
    Search {
        /// Job or task description to match against
        query: String,
        /// Maximum number of results (default: configured retrieval.default_k)
        #[arg(long)]
        max_results: Option<usize>,
        /// Emit results as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Produce a natural-language recommendation for a job description
    Recommend {
        /// Job or task description
        query: String,
    },
    /// Show catalog and embedding-cache statistics
    Status,
    /// Serve the engine over line-delimited JSON-RPC on stdio
    Serve,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.root)?;

    match cli.command {
        Commands::Init => cmd_init(&config, &cli.root),
        Commands::Build => cmd_build(&config, &cli.root),
        Commands::Search {
            query,
            max_results,
            json,
        } => cmd_search(&config, &cli.root, &query, max_results, json),
        Commands::Recommend { query } => cmd_recommend(&config, &cli.root, &query),
        Commands::Status => cmd_status(&config, &cli.root),
        Commands::Serve => api::server::run(&config, &cli.root),
    }
}

fn cmd_init(config: &Config, root: &Path) -> Result<()> {
    config.save(root)?;
    println!(
        "Wrote {}",
        config.storage_dir(root).join("config.toml").display()
    );
    let catalog_path = config.catalog_path(root);
    if !catalog_path.exists() {
        println!(
            "Note: no catalog at {} yet — point [catalog].path at a dataset before building.",
            catalog_path.display()
        );
    }
    Ok(())
}

fn cmd_build(config: &Config, root: &Path) -> Result<()> {
    let engine = Engine::new(config, root)?;
    let stats = engine.stats();
    println!(
        "Catalog: {} records, {} dimensions ({})",
        stats.record_count, stats.dimensions, stats.embed_model
    );
    println!(
        "Embeddings: {} computed, {} reused from cache",
        stats.newly_embedded, stats.reused_from_cache
    );
    Ok(())
}

fn cmd_search(
    config: &Config,
    root: &Path,
    query: &str,
    max_results: Option<usize>,
    json: bool,
) -> Result<()> {
    let engine = Engine::new(config, root)?;
    let hits = engine.search(query, max_results.unwrap_or_else(|| engine.default_k()))?;

    if json {
        let assessments: Vec<RecommendedAssessment> =
            hits.iter().map(RecommendedAssessment::from_scored).collect();
        println!("{}", serde_json::to_string_pretty(&assessments)?);
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let record = &hit.record;
        println!("{}. {}  (score {:.3})", i + 1, record.name, hit.score);
        let tags = if record.test_types.is_empty() {
            "unspecified".to_string()
        } else {
            record.test_types.join(", ")
        };
        let duration = if record.duration_minutes > 0 {
            format!("{} min", record.duration_minutes)
        } else {
            "duration n/a".to_string()
        };
        println!(
            "   {tags} | {duration} | remote {} | adaptive {}",
            api::protocol::yes_no(record.remote_support),
            api::protocol::yes_no(record.adaptive_support),
        );
        println!("   {}", record.url);
    }
    Ok(())
}

fn cmd_recommend(config: &Config, root: &Path, query: &str) -> Result<()> {
    let engine = Engine::new(config, root)?;
    let explanation = engine.recommend(query)?;
    println!("{explanation}");
    Ok(())
}

fn cmd_status(config: &Config, root: &Path) -> Result<()> {
    use store::sqlite::EmbeddingCache;

    let catalog = catalog::Catalog::load(&config.catalog_path(root))?;
    let cache = EmbeddingCache::open(&config.storage_dir(root))?;
    let model = embed::model_label(&config.embed.backend);
    let embedded = cache.embedded_count(&model)?;

    println!("Catalog:    {} records", catalog.len());
    println!(
        "Embeddings: {}/{} cached for {}",
        embedded,
        catalog.len(),
        model
    );
    println!("Cache size: {} bytes", cache.db_size_bytes());
    let counts = catalog.test_type_counts();
    if !counts.is_empty() {
        println!("Test types:");
        for (name, count) in counts {
            println!("  {count:>4}  {name}");
        }
    }
    Ok(())
}
