use thiserror::Error;

/// Errors crossing the engine boundary. Callers match on the variant:
/// catalog and store failures are fatal at construction, invalid queries
/// and embedding failures surface from `search`, and explanation failures
/// are recoverable via the templated fallback.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The catalog dataset is missing, malformed, or inconsistent.
    /// Construction must fail loudly rather than serve an empty catalog.
    #[error("catalog load failed: {0}")]
    CatalogLoad(String),

    /// Caller error: empty or otherwise unusable query input.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding backend unavailable or rejected the input. Never folded
    /// into an empty result set; zero matches and a broken embedder are
    /// different answers.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Generation backend failure or invalid generated text. `recommend`
    /// degrades to a templated explanation on this variant.
    #[error("explanation failed: {0}")]
    Explanation(String),

    /// Embedding-cache or internal state failure.
    #[error("store error: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        let err = EngineError::InvalidQuery("query is empty".into());
        assert_eq!(err.to_string(), "invalid query: query is empty");
    }

    #[test]
    fn sqlite_errors_become_store_errors() {
        let err: EngineError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, EngineError::Store(_)));
    }
}
