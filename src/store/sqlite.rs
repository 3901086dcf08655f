use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::schema;
use crate::error::EngineError;

/// Persisted record embeddings, keyed by (record id, model). Purely an
/// optimization: a missing or corrupt row is recomputed, never trusted.
pub struct EmbeddingCache {
    conn: Connection,
    db_path: PathBuf,
}

pub struct CachedEmbedding {
    pub source_hash: String,
    pub vector: Vec<f32>,
}

impl EmbeddingCache {
    pub fn open(storage_dir: &Path) -> Result<Self, EngineError> {
        std::fs::create_dir_all(storage_dir).map_err(|e| {
            EngineError::Store(format!(
                "creating storage dir {}: {e}",
                storage_dir.display()
            ))
        })?;
        let db_path = storage_dir.join("embeddings.db");
        let conn = Connection::open(&db_path).map_err(|e| {
            EngineError::Store(format!("opening database at {}: {e}", db_path.display()))
        })?;
        schema::run_migrations(&conn)?;
        Ok(Self { conn, db_path })
    }

    /// Look up a cached vector. Returns None on a miss or on a row whose
    /// blob doesn't decode to its declared dimensionality.
    pub fn get(&self, record_id: &str, model: &str) -> Result<Option<CachedEmbedding>, EngineError> {
        let row = self
            .conn
            .query_row(
                "SELECT source_hash, dimensions, vector FROM embeddings
                 WHERE record_id = ?1 AND model = ?2",
                params![record_id, model],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((source_hash, dimensions, blob)) = row else {
            return Ok(None);
        };
        match decode_vector(&blob) {
            Some(vector) if vector.len() as i64 == dimensions => {
                Ok(Some(CachedEmbedding {
                    source_hash,
                    vector,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn upsert(
        &self,
        record_id: &str,
        model: &str,
        source_hash: &str,
        vector: &[f32],
    ) -> Result<(), EngineError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO embeddings (record_id, model, source_hash, dimensions, vector, embedded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(record_id, model) DO UPDATE SET
                source_hash = excluded.source_hash,
                dimensions = excluded.dimensions,
                vector = excluded.vector,
                embedded_at = excluded.embedded_at",
            params![
                record_id,
                model,
                source_hash,
                vector.len() as i64,
                encode_vector(vector),
                now
            ],
        )?;
        Ok(())
    }

    pub fn embedded_count(&self, model: &str) -> Result<i64, EngineError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE model = ?1",
            params![model],
            |r| r.get(0),
        )?)
    }

    pub fn db_size_bytes(&self) -> u64 {
        std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
    }
}

/// BLAKE3 of the embedding source text, hex-encoded. Detects catalog rows
/// whose text changed since their vector was cached.
pub fn source_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_cache() -> (tempfile::TempDir, EmbeddingCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        (dir, cache)
    }

    #[test]
    fn vector_blob_roundtrips() {
        let vector = vec![0.25f32, -1.5, 0.0, 3.75];
        let decoded = decode_vector(&encode_vector(&vector)).unwrap();
        assert_eq!(decoded, vector);
    }

    #[test]
    fn truncated_blob_decodes_to_none() {
        assert!(decode_vector(&[0, 1, 2]).is_none());
        assert_eq!(decode_vector(&[]), Some(Vec::new()));
    }

    #[test]
    fn get_on_empty_cache_misses() {
        let (_dir, cache) = open_cache();
        assert!(cache.get("r1", "hash-256").unwrap().is_none());
    }

    #[test]
    fn upsert_then_get_returns_the_vector() {
        let (_dir, cache) = open_cache();
        let vector = vec![0.1f32, 0.2, 0.3];
        cache.upsert("r1", "hash-256", "abc123", &vector).unwrap();

        let cached = cache.get("r1", "hash-256").unwrap().unwrap();
        assert_eq!(cached.source_hash, "abc123");
        assert_eq!(cached.vector, vector);
    }

    #[test]
    fn upsert_overwrites_the_previous_row() {
        let (_dir, cache) = open_cache();
        cache.upsert("r1", "hash-256", "old", &[1.0]).unwrap();
        cache.upsert("r1", "hash-256", "new", &[2.0, 3.0]).unwrap();

        let cached = cache.get("r1", "hash-256").unwrap().unwrap();
        assert_eq!(cached.source_hash, "new");
        assert_eq!(cached.vector, vec![2.0, 3.0]);
        assert_eq!(cache.embedded_count("hash-256").unwrap(), 1);
    }

    #[test]
    fn models_are_cached_independently() {
        let (_dir, cache) = open_cache();
        cache.upsert("r1", "hash-256", "h", &[1.0]).unwrap();
        cache.upsert("r1", "nomic-embed-text", "h", &[2.0]).unwrap();

        assert_eq!(cache.get("r1", "hash-256").unwrap().unwrap().vector, vec![1.0]);
        assert_eq!(
            cache.get("r1", "nomic-embed-text").unwrap().unwrap().vector,
            vec![2.0]
        );
        assert_eq!(cache.embedded_count("hash-256").unwrap(), 1);
    }

    #[test]
    fn source_hash_is_stable_and_input_sensitive() {
        assert_eq!(source_hash("text"), source_hash("text"));
        assert_ne!(source_hash("text"), source_hash("other"));
    }

    #[test]
    fn reopening_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = EmbeddingCache::open(dir.path()).unwrap();
            cache.upsert("r1", "hash-256", "h", &[1.0, 2.0]).unwrap();
        }
        let cache = EmbeddingCache::open(dir.path()).unwrap();
        assert_eq!(
            cache.get("r1", "hash-256").unwrap().unwrap().vector,
            vec![1.0, 2.0]
        );
    }
}
