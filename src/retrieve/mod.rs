use crate::catalog::{AssessmentRecord, Catalog};
use crate::embed::Embedder;
use crate::error::EngineError;
use crate::index::VectorIndex;

/// `k` used when the caller doesn't ask for a specific result count.
pub const DEFAULT_K: usize = 10;

/// One ranked match: an owned record plus its cosine similarity. Owned so
/// results outlive any engine borrow the caller holds.
#[derive(Debug, Clone)]
pub struct ScoredAssessment {
    pub record: AssessmentRecord,
    pub score: f32,
}

/// Embedder + index + catalog, orchestrated: free text in, ranked records
/// out. Query validation happens here, before any embedding work.
#[derive(Debug)]
pub struct Retriever {
    catalog: Catalog,
    embedder: Box<dyn Embedder>,
    index: VectorIndex,
}

impl Retriever {
    pub fn new(
        catalog: Catalog,
        embedder: Box<dyn Embedder>,
        index: VectorIndex,
    ) -> Result<Self, EngineError> {
        if index.len() != catalog.len() {
            return Err(EngineError::Store(format!(
                "index holds {} entries for a catalog of {}",
                index.len(),
                catalog.len()
            )));
        }
        if embedder.dimensions() != 0 && embedder.dimensions() != index.dimensions() {
            return Err(EngineError::Store(format!(
                "embedder produces {}-dimensional vectors, index holds {}",
                embedder.dimensions(),
                index.dimensions()
            )));
        }
        Ok(Self {
            catalog,
            embedder,
            index,
        })
    }

    /// Rank the catalog against a free-text query. Embedding failures
    /// propagate unchanged — a broken backend must stay distinguishable
    /// from zero matches, and retries belong to the caller's transport
    /// layer, not here.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredAssessment>, EngineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::InvalidQuery(
                "query is empty or whitespace-only".into(),
            ));
        }
        if k == 0 {
            return Err(EngineError::InvalidQuery("k must be positive".into()));
        }

        let query_embedding = self.embedder.embed(query)?;
        let hits = self.index.query(&query_embedding, k)?;

        let mut results = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let record = self.catalog.get(&id).ok_or_else(|| {
                EngineError::Store(format!("index entry `{id}` has no catalog record"))
            })?;
            results.push(ScoredAssessment {
                record: record.clone(),
                score,
            });
        }
        Ok(results)
    }
}
