use rusqlite::Connection;

use crate::error::EngineError;

pub fn run_migrations(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One cached vector per (record, model). source_hash is the BLAKE3
        -- of the embedding source text; a stale hash means the record
        -- changed and the vector must be recomputed.
        CREATE TABLE IF NOT EXISTS embeddings (
            record_id   TEXT NOT NULL,
            model       TEXT NOT NULL,
            source_hash TEXT NOT NULL,
            dimensions  INTEGER NOT NULL,
            vector      BLOB NOT NULL,
            embedded_at TEXT NOT NULL,
            PRIMARY KEY (record_id, model)
        );
        CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);
    ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
