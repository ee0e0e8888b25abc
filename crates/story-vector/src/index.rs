//! Vector index trait and types.
//!
//! Defines the interface for vector similarity search.

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Insertion position of the vector; also its metadata position
    pub ordinal: usize,
    /// Squared Euclidean distance to the query (lower = more similar)
    pub distance: f32,
}

impl SearchResult {
    pub fn new(ordinal: usize, distance: f32) -> Self {
        Self { ordinal, distance }
    }

    /// Score surfaced to callers: `1 - distance`. Not bounded to `[0, 1]`.
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Bytes the vector data occupies in memory
    pub size_bytes: u64,
}

/// Trait for vector indexes.
///
/// Ordinals are assigned in insertion order starting at zero.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add all vectors in one shot. Fails if the index already holds vectors.
    fn build(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorError>;

    /// Search for the `k` nearest vectors.
    /// Returns at most `min(k, len)` results, nearest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;
}
