//! Batched embedding over passages.
//!
//! Splits input into batches of at most `batch_size` texts, calls the model
//! once per batch and concatenates results in input order. A failure in any
//! batch fails the whole call; no partial results are returned.

use std::sync::Arc;

use story_types::{Passage, StoryConfig};
use tracing::debug;

use crate::error::EmbeddingError;
use crate::model::EmbeddingModel;

/// Embedding front-end used by ingestion and retrieval.
#[derive(Clone)]
pub struct BatchEmbedder {
    model: Arc<dyn EmbeddingModel>,
    batch_size: usize,
    dimension: usize,
}

impl std::fmt::Debug for BatchEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEmbedder")
            .field("model", &self.model.info().name)
            .field("batch_size", &self.batch_size)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl BatchEmbedder {
    /// Wrap a model. Fails fast if the model's declared dimension differs
    /// from `dimension` or if `batch_size` is zero.
    pub fn new(
        model: Arc<dyn EmbeddingModel>,
        batch_size: usize,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        if batch_size == 0 {
            return Err(EmbeddingError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }
        let declared = model.info().dimension;
        if declared != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: declared,
            });
        }
        Ok(Self {
            model,
            batch_size,
            dimension,
        })
    }

    /// Wrap a model using `batch_size` and `embedding_dimension` from config.
    pub fn from_config(
        model: Arc<dyn EmbeddingModel>,
        config: &StoryConfig,
    ) -> Result<Self, EmbeddingError> {
        Self::new(model, config.batch_size, config.embedding_dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn model_name(&self) -> &str {
        &self.model.info().name
    }

    /// Embed texts in order, `batch_size` at a time.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch_idx, batch) in texts.chunks(self.batch_size).enumerate() {
            let embeddings = self.model.embed_texts(batch)?;
            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    sent: batch.len(),
                    received: embeddings.len(),
                });
            }
            for embedding in embeddings {
                if embedding.dimension() != self.dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimension,
                        actual: embedding.dimension(),
                    });
                }
                vectors.push(embedding.into_values());
            }
            debug!(batch = batch_idx, size = batch.len(), "Embedded batch");
        }

        Ok(vectors)
    }

    /// Embed a single query string.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[query.to_string()])?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            sent: 1,
            received: 0,
        })
    }

    /// Attach an embedding to every passage.
    pub fn embed_chunks(&self, passages: Vec<Passage>) -> Result<Vec<Passage>, EmbeddingError> {
        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embed(&texts)?;

        Ok(passages
            .into_iter()
            .zip(vectors)
            .map(|(passage, vector)| passage.with_embedding(vector))
            .collect())
    }
}
