use std::path::Path;
use std::sync::{Mutex, OnceLock};

use crate::catalog::Catalog;
use crate::config::{Config, ExplainBackend};
use crate::embed;
use crate::error::EngineError;
use crate::explain::{Explainer, TextGenerator, ollama::OllamaGenerator};
use crate::index::{IndexEntry, VectorIndex};
use crate::retrieve::{Retriever, ScoredAssessment};
use crate::store::sqlite::{EmbeddingCache, source_hash};

/// The assembled pipeline: catalog + embedder + index + explainer behind
/// the two public operations. Construction is expensive relative to a
/// query; build once and reuse. All state is read-only after construction,
/// so concurrent `search`/`recommend` calls need no locking.
#[derive(Debug)]
pub struct Engine {
    retriever: Retriever,
    explainer: Explainer,
    recommend_k: usize,
    search_k: usize,
    stats: EngineStats,
}

/// Snapshot taken at construction for the status surfaces.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub record_count: usize,
    pub dimensions: usize,
    pub embed_model: String,
    pub explain_backend: String,
    pub newly_embedded: usize,
    pub reused_from_cache: usize,
    pub test_type_counts: Vec<(String, usize)>,
    pub db_size_bytes: u64,
}

impl Engine {
    /// Load the catalog, embed every record (reusing cached vectors whose
    /// source hash still matches), and build the index. Any failure here
    /// is fatal — the engine never starts with a partial catalog.
    pub fn new(config: &Config, root: &Path) -> Result<Self, EngineError> {
        let catalog = Catalog::load(&config.catalog_path(root))?;
        let embedder = embed::from_config(&config.embed.backend)?;
        let cache = EmbeddingCache::open(&config.storage_dir(root))?;

        let model = embedder.model_name().to_string();
        let mut entries = Vec::with_capacity(catalog.len());
        let mut newly_embedded = 0;
        let mut reused_from_cache = 0;

        for record in catalog.records() {
            let text = embed::embedding_text(record);
            let hash = source_hash(&text);
            let vector = match cache.get(&record.id, &model)? {
                Some(cached) if cached.source_hash == hash => {
                    reused_from_cache += 1;
                    cached.vector
                }
                _ => {
                    let vector = embedder.embed(&text)?;
                    cache.upsert(&record.id, &model, &hash, &vector)?;
                    newly_embedded += 1;
                    vector
                }
            };
            entries.push(IndexEntry {
                id: record.id.clone(),
                vector,
            });
        }

        let index = VectorIndex::build(entries)?;
        let explainer = build_explainer(config);

        let stats = EngineStats {
            record_count: catalog.len(),
            dimensions: index.dimensions(),
            embed_model: model,
            explain_backend: explainer.backend_name().to_string(),
            newly_embedded,
            reused_from_cache,
            test_type_counts: catalog.test_type_counts(),
            db_size_bytes: cache.db_size_bytes(),
        };

        let retriever = Retriever::new(catalog, embedder, index)?;
        Ok(Self::from_parts(
            retriever,
            explainer,
            config.explain.top_k.max(1),
            config.retrieval.default_k.max(1),
            stats,
        ))
    }

    pub(crate) fn from_parts(
        retriever: Retriever,
        explainer: Explainer,
        recommend_k: usize,
        search_k: usize,
        stats: EngineStats,
    ) -> Self {
        Self {
            retriever,
            explainer,
            recommend_k,
            search_k,
            stats,
        }
    }

    /// Rank the catalog against a free-text query.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredAssessment>, EngineError> {
        self.retriever.search(query, k)
    }

    /// Retrieve with the configured explanation breadth, then justify.
    /// A failed generation degrades to the templated listing; retrieval
    /// failures propagate, since there is nothing to template from.
    pub fn recommend(&self, query: &str) -> Result<String, EngineError> {
        let hits = self.retriever.search(query, self.recommend_k)?;
        match self.explainer.explain(query, &hits) {
            Ok(text) => Ok(text),
            Err(EngineError::Explanation(reason)) => {
                eprintln!("warning: explanation backend failed ({reason}); using templated fallback");
                Ok(self.explainer.fallback(query, &hits))
            }
            Err(other) => Err(other),
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Configured `k` for callers that don't specify one.
    pub fn default_k(&self) -> usize {
        self.search_k
    }
}

fn build_explainer(config: &Config) -> Explainer {
    let generator: Option<Box<dyn TextGenerator>> = match &config.explain.backend {
        ExplainBackend::Template => None,
        ExplainBackend::Ollama {
            model,
            url,
            timeout_secs,
        } => Some(Box::new(OllamaGenerator::new(url, model, *timeout_secs))),
    };
    Explainer::new(generator, config.explain.max_chars.max(1))
}

static SHARED: OnceLock<Engine> = OnceLock::new();
static SHARED_INIT: Mutex<()> = Mutex::new(());

/// Process-wide engine, built exactly once. Concurrent first callers
/// coalesce on the init lock (double-checked against the OnceLock), so
/// the expensive build never runs twice; later callers are lock-free.
pub fn shared(config: &Config, root: &Path) -> Result<&'static Engine, EngineError> {
    if let Some(engine) = SHARED.get() {
        return Ok(engine);
    }

    let _guard = SHARED_INIT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(engine) = SHARED.get() {
        return Ok(engine);
    }

    let engine = Engine::new(config, root)?;
    Ok(SHARED.get_or_init(|| engine))
}
