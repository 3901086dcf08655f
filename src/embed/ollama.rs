use serde::Deserialize;

use super::{Embedder, Embedding};
use crate::error::EngineError;

/// Hard cap on text sent to the model. Catalog descriptions are short;
/// this only guards against pathological inputs.
const MAX_INPUT_BYTES: usize = 8192;

#[derive(Debug)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Probes the model with a short test string to pin the dimensionality
    /// for the life of the process. An unreachable backend fails here, at
    /// construction, not mid-query.
    pub fn new(base_url: &str, model: &str) -> Result<Self, EngineError> {
        let mut embedder = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions: 0,
        };

        let probe = embedder.request("dimension probe")?;
        if probe.is_empty() {
            return Err(EngineError::Embedding(format!(
                "model {model} returned an empty embedding"
            )));
        }
        embedder.dimensions = probe.len();
        Ok(embedder)
    }

    fn request(&self, text: &str) -> Result<Embedding, EngineError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let mut response = match ureq::post(&url).send_json(&body) {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(EngineError::Embedding(format!(
                    "ollama returned HTTP {code}"
                )));
            }
            Err(e) => {
                return Err(EngineError::Embedding(format!(
                    "ollama embedding request failed: {e}"
                )));
            }
        };

        let resp: EmbeddingResponse = response.body_mut().read_json().map_err(|e| {
            EngineError::Embedding(format!("parsing ollama embedding response: {e}"))
        })?;

        Ok(resp.embedding)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::Embedding(
                "cannot embed empty or whitespace-only text".into(),
            ));
        }

        let text = if text.len() > MAX_INPUT_BYTES {
            let mut end = MAX_INPUT_BYTES;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            &text[..end]
        } else {
            text
        };

        let embedding = self.request(text)?;
        if self.dimensions != 0 && embedding.len() != self.dimensions {
            return Err(EngineError::Embedding(format!(
                "model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
