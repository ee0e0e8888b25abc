//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from text.

use crate::error::EmbeddingError;

/// Vector embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create an embedding normalized to unit length.
    /// Zero vectors are left as-is.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Wrap raw values without normalization.
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Squared Euclidean distance. Mismatched dimensions compare as infinitely far.
    pub fn squared_distance(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

/// Trait for embedding models.
///
/// Batch calls must be order-preserving: output `i` embeds input `i`.
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts.
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Generate embeddings for multiple owned strings.
    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed_batch(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_normalization() {
        let emb = Embedding::new(vec![3.0, 4.0]);
        // 3-4-5 triangle: normalized should be [0.6, 0.8]
        assert!((emb.values[0] - 0.6).abs() < 0.001);
        assert!((emb.values[1] - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        let emb = Embedding::new(vec![0.0, 0.0, 0.0]);
        assert_eq!(emb.values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_squared_distance() {
        let a = Embedding::from_raw(vec![1.0, 2.0]);
        let b = Embedding::from_raw(vec![4.0, 6.0]);
        assert!((a.squared_distance(&b) - 25.0).abs() < 1e-6);
        assert_eq!(a.squared_distance(&a), 0.0);
    }

    #[test]
    fn test_squared_distance_dimension_mismatch() {
        let a = Embedding::from_raw(vec![1.0, 2.0]);
        let b = Embedding::from_raw(vec![1.0]);
        assert!(a.squared_distance(&b).is_infinite());
    }
}
