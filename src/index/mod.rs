use crate::embed::{Embedding, cosine_similarity};
use crate::error::EngineError;

/// One indexed catalog entry: the record id plus its embedding.
#[derive(Debug)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Embedding,
}

/// In-memory nearest-neighbor index over the catalog embeddings. Built
/// once at engine construction and read-only afterwards; the catalog is
/// static per process, so there is no insert/delete path.
#[derive(Debug)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Entries must arrive in catalog order — that order is the tie-break
    /// for equal scores. Dimensionality mismatches fail the build.
    pub fn build(entries: Vec<IndexEntry>) -> Result<Self, EngineError> {
        let first = entries.first().ok_or_else(|| {
            EngineError::CatalogLoad("cannot build an index over an empty catalog".into())
        })?;
        let dimensions = first.vector.len();
        if dimensions == 0 {
            return Err(EngineError::Embedding(format!(
                "embedding for `{}` has zero dimensions",
                first.id
            )));
        }
        for entry in &entries {
            if entry.vector.len() != dimensions {
                return Err(EngineError::Embedding(format!(
                    "embedding for `{}` has {} dimensions, expected {dimensions}",
                    entry.id,
                    entry.vector.len()
                )));
            }
        }
        Ok(Self {
            dimensions,
            entries,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k entries by cosine similarity, score-descending. Equal scores
    /// resolve to the earlier entry, so repeated queries against the same
    /// catalog order identically. A k beyond the catalog size returns the
    /// whole catalog ranked.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(String, f32)>, EngineError> {
        if vector.len() != self.dimensions {
            return Err(EngineError::Embedding(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_similarity(vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, score)| (self.entries[pos].id.clone(), score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            vector,
        }
    }

    fn small_index() -> VectorIndex {
        VectorIndex::build(vec![
            entry("a", vec![1.0, 0.0, 0.0]),
            entry("b", vec![0.0, 1.0, 0.0]),
            entry("c", vec![0.7, 0.7, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn ranks_by_cosine_similarity_descending() {
        let index = small_index();
        let hits = index.query(&[1.0, 0.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
        assert!(hits[0].1 >= hits[1].1 && hits[1].1 >= hits[2].1);
    }

    #[test]
    fn truncates_to_k() {
        let index = small_index();
        let hits = index.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn k_beyond_catalog_returns_everything_ranked() {
        let index = small_index();
        let hits = index.query(&[1.0, 0.0, 0.0], 50).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let index = VectorIndex::build(vec![
            entry("later", vec![0.0, 1.0]),
            entry("first-dup", vec![1.0, 0.0]),
            entry("second-dup", vec![1.0, 0.0]),
        ])
        .unwrap();
        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["first-dup", "second-dup", "later"]);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let index = small_index();
        let first = index.query(&[0.4, 0.9, 0.0], 3).unwrap();
        let second = index.query(&[0.4, 0.9, 0.0], 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_build_is_rejected() {
        let err = VectorIndex::build(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::CatalogLoad(_)));
    }

    #[test]
    fn mismatched_dimensions_fail_build() {
        let err = VectorIndex::build(vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![1.0, 0.0, 0.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::Embedding(_)));
    }

    #[test]
    fn mismatched_query_vector_fails() {
        let index = small_index();
        let err = index.query(&[1.0, 0.0], 2).unwrap_err();
        assert!(matches!(err, EngineError::Embedding(_)));
    }
}
