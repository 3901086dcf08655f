use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::{Embedder, Embedding, l2_normalize};
use crate::error::EngineError;

/// Deterministic offline embedder: tokens are hashed into a fixed number
/// of signed buckets and the result is L2-normalized. No model weights,
/// no network — identical text always yields an identical vector, which
/// catalog-build idempotence and the test suite rely on.
#[derive(Debug)]
pub struct HashEmbedder {
    dimensions: usize,
    name: String,
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+").unwrap())
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "i",
            "in", "is", "it", "its", "need", "of", "on", "s", "that", "the", "to", "was",
            "were", "will", "with",
        ]
        .into_iter()
        .collect()
    })
}

/// FNV-1a, 64-bit. Spelled out rather than pulled from a hasher crate:
/// cached vectors in the store must stay valid across builds, so the
/// token hash can never change out from under us.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            name: format!("hash-{dimensions}"),
        }
    }

    fn tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        token_pattern()
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .filter(|token| !stop_words().contains(token.as_str()))
            .collect()
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::Embedding(
                "cannot embed empty or whitespace-only text".into(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for token in Self::tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::cosine_similarity;

    #[test]
    fn identical_text_embeds_identically() {
        let embedder = HashEmbedder::new(128);
        let a = embedder.embed("numerical reasoning under time pressure").unwrap();
        let b = embedder.embed("numerical reasoning under time pressure").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn output_has_fixed_dimensionality() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed("short").unwrap();
        assert_eq!(v.len(), 64);
        assert_eq!(embedder.dimensions(), 64);
    }

    #[test]
    fn empty_and_whitespace_input_fail() {
        let embedder = HashEmbedder::new(64);
        assert!(matches!(
            embedder.embed("").unwrap_err(),
            EngineError::Embedding(_)
        ));
        assert!(matches!(
            embedder.embed("   \t\n").unwrap_err(),
            EngineError::Embedding(_)
        ));
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashEmbedder::new(128);
        let v = embedder.embed("verbal comprehension of written passages").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_scores_higher_than_disjoint() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("assess numerical ability").unwrap();
        let numerical = embedder
            .embed("Numerical reasoning test with charts and numerical data")
            .unwrap();
        let cooking = embedder.embed("prepare soup and bake bread").unwrap();
        assert!(
            cosine_similarity(&query, &numerical) > cosine_similarity(&query, &cooking)
        );
    }

    #[test]
    fn tokenizer_lowercases_and_strips_punctuation() {
        let tokens = HashEmbedder::tokenize("Candidate's Numerical/Verbal skills!");
        assert_eq!(tokens, vec!["candidate", "numerical", "verbal", "skills"]);
    }

    #[test]
    fn fnv1a_matches_reference_vectors() {
        // Published FNV-1a test vectors
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x85944171f73967e8);
    }
}
