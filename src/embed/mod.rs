pub mod hash;
pub mod ollama;

use crate::catalog::AssessmentRecord;
use crate::config::EmbedBackend;
use crate::error::EngineError;

pub type Embedding = Vec<f32>;

/// Maps text into the shared semantic vector space. Implementations must
/// be deterministic for identical input and keep a fixed dimensionality
/// for the life of the process.
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed one text. Empty or whitespace-only input is an error, never a
    /// zero vector, so a broken input can't masquerade as "no matches".
    fn embed(&self, text: &str) -> Result<Embedding, EngineError>;
    fn dimensions(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Construct the configured backend. The Ollama backend probes its
/// dimensionality here, so an unreachable server fails construction.
pub fn from_config(backend: &EmbedBackend) -> Result<Box<dyn Embedder>, EngineError> {
    match backend {
        EmbedBackend::Hash { dimensions } => {
            if *dimensions == 0 {
                return Err(EngineError::Embedding(
                    "hash embedder dimensions must be positive".into(),
                ));
            }
            Ok(Box::new(hash::HashEmbedder::new(*dimensions)))
        }
        EmbedBackend::Ollama { model, url } => {
            Ok(Box::new(ollama::OllamaEmbedder::new(url, model)?))
        }
    }
}

/// Display label for a backend without constructing it. Matches what the
/// constructed embedder reports as `model_name`.
pub fn model_label(backend: &EmbedBackend) -> String {
    match backend {
        EmbedBackend::Hash { dimensions } => format!("hash-{dimensions}"),
        EmbedBackend::Ollama { model, .. } => model.clone(),
    }
}

/// Text a record is embedded from. Name and tags carry signal the
/// description sometimes lacks, so all three go into the vector.
pub fn embedding_text(record: &AssessmentRecord) -> String {
    format!(
        "{}\n{}\n{}",
        record.name,
        record.test_types.join(", "),
        record.description
    )
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
