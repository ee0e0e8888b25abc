//! Passage index: a [`FlatIndex`] paired with its [`MetadataStore`].

use std::path::Path;

use story_storage::{INDEX_FILE, METADATA_FILE};
use story_types::{Passage, PassageMeta};
use tracing::info;

use crate::error::VectorError;
use crate::flat::FlatIndex;
use crate::index::{IndexStats, SearchResult, VectorIndex};
use crate::metadata::MetadataStore;

/// A search hit resolved to its passage.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageHit {
    pub result: SearchResult,
    pub passage: PassageMeta,
}

/// Searchable passages of one story version.
#[derive(Debug, Clone)]
pub struct IndexStore {
    index: FlatIndex,
    metadata: MetadataStore,
}

impl IndexStore {
    /// Empty store for vectors of `dimension`.
    pub fn new(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            metadata: MetadataStore::default(),
        }
    }

    /// Index `passages` in order. Every passage must carry an embedding of
    /// the store's dimension; nothing is indexed if any one does not.
    pub fn build(&mut self, passages: &[Passage]) -> Result<(), VectorError> {
        if !self.index.is_empty() {
            return Err(VectorError::AlreadyBuilt(self.index.len()));
        }

        let vectors = passages
            .iter()
            .enumerate()
            .map(|(ordinal, p)| {
                p.embedding
                    .clone()
                    .ok_or(VectorError::MissingEmbedding { ordinal })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.index.build(&vectors)?;
        self.metadata = MetadataStore::new(passages.iter().map(Passage::meta).collect());

        info!(passages = passages.len(), dim = self.index.dimension(), "Built passage index");
        Ok(())
    }

    /// Ordinals of the `k` nearest passages, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<usize>, VectorError> {
        Ok(self
            .search_with_scores(query, k)?
            .into_iter()
            .map(|r| r.ordinal)
            .collect())
    }

    pub fn search_with_scores(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, VectorError> {
        self.index.search(query, k)
    }

    /// Search and resolve each hit to its passage metadata.
    pub fn search_passages(&self, query: &[f32], k: usize) -> Result<Vec<PassageHit>, VectorError> {
        self.search_with_scores(query, k)?
            .into_iter()
            .map(|result| {
                let passage = self.metadata.get(result.ordinal).cloned().ok_or(
                    VectorError::MetadataMismatch {
                        index: self.index.len(),
                        metadata: self.metadata.len(),
                    },
                )?;
                Ok(PassageHit { result, passage })
            })
            .collect()
    }

    pub fn passage(&self, ordinal: usize) -> Option<&PassageMeta> {
        self.metadata.get(ordinal)
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Write `index.flat` and `metadata.json` into `index_dir`.
    pub fn save(&self, index_dir: &Path) -> Result<(), VectorError> {
        std::fs::create_dir_all(index_dir)?;
        self.index.save(&index_dir.join(INDEX_FILE))?;
        self.metadata.save(&index_dir.join(METADATA_FILE))?;
        Ok(())
    }

    /// Load a store written by [`IndexStore::save`].
    pub fn load(index_dir: &Path) -> Result<Self, VectorError> {
        let index = FlatIndex::load(&index_dir.join(INDEX_FILE))?;
        let metadata = MetadataStore::load(&index_dir.join(METADATA_FILE))?;

        if index.len() != metadata.len() {
            return Err(VectorError::MetadataMismatch {
                index: index.len(),
                metadata: metadata.len(),
            });
        }

        Ok(Self { index, metadata })
    }
}
