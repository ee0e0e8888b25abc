//! Deterministic feature-hashing embedder.
//!
//! Maps each lowercase word to a signed bucket with FNV-1a and sums the
//! buckets. Texts sharing words land close together, which is enough for
//! exercising retrieval without downloading a model. Output is stable across
//! runs and platforms.

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Feature-hashing embedder with a configurable dimension.
pub struct HashEmbedder {
    info: ModelInfo,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: format!("feature-hash-{}", dimension),
                dimension,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

impl EmbeddingModel for HashEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let dimension = self.info.dimension;
        if dimension == 0 {
            return Err(EmbeddingError::InvalidInput(
                "dimension must be > 0".to_string(),
            ));
        }

        let mut values = vec![0.0f32; dimension];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = fnv1a(word.as_bytes());
            let bucket = (hash % dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            values[bucket] += sign;
        }

        Ok(Embedding::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("The whale surfaced at dawn").unwrap();
        let b = embedder.embed("The whale surfaced at dawn").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 64);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("Ahab, the captain!").unwrap();
        let b = embedder.embed("ahab the CAPTAIN").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let embedder = HashEmbedder::new(128);
        let query = embedder.embed("captain ahab hunts the whale").unwrap();
        let near = embedder.embed("ahab the captain and his whale").unwrap();
        let far = embedder.embed("recipes for fresh pasta dough").unwrap();
        assert!(query.squared_distance(&near) < query.squared_distance(&far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let emb = embedder.embed("").unwrap();
        assert!(emb.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let embedder = HashEmbedder::new(0);
        assert!(matches!(
            embedder.embed("text"),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }
}
