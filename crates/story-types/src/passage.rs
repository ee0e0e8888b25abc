//! Passage types.
//!
//! A passage is a contiguous slice of the source text. Offsets are counted in
//! characters (Unicode scalar values), never bytes, so they stay meaningful for
//! non-ASCII prose.

use serde::{Deserialize, Serialize};

/// A slice of source text, optionally carrying its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text (exactly `source[start_pos..end_pos]` in characters)
    pub text: String,
    /// Inclusive start offset in characters
    pub start_pos: usize,
    /// Exclusive end offset in characters
    pub end_pos: usize,
    /// Embedding attached by the embedder; absent until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Passage {
    /// Create a passage without an embedding.
    pub fn new(text: impl Into<String>, start_pos: usize, end_pos: usize) -> Self {
        Self {
            text: text.into(),
            start_pos,
            end_pos,
            embedding: None,
        }
    }

    /// Attach an embedding (builder pattern).
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Length of the passage in characters.
    pub fn char_len(&self) -> usize {
        self.end_pos - self.start_pos
    }

    /// Embedding-free view of this passage.
    pub fn meta(&self) -> PassageMeta {
        PassageMeta {
            text: self.text.clone(),
            start_pos: self.start_pos,
            end_pos: self.end_pos,
        }
    }
}

/// Passage metadata aligned with vector index ordinals.
///
/// Embeddings are deliberately absent: the vectors live in the index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMeta {
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl From<&Passage> for PassageMeta {
    fn from(passage: &Passage) -> Self {
        passage.meta()
    }
}
