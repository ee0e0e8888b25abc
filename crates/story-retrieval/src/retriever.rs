//! Semantic retrieval over the current version of a story.
//!
//! The index for the current version is loaded on first use and kept until
//! the registry's `current_version` moves (a new snapshot or a revert).

use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use story_embeddings::BatchEmbedder;
use story_profiles::ProfileStore;
use story_storage::VersionManager;
use story_vector::{IndexStore, PassageHit};
use tracing::{debug, info};

use crate::error::RetrievalError;
use crate::query::{character_query, plot_query, relationship_query};

/// One passage returned for a query, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// 1-based position in the result list
    pub rank: usize,
    /// Position of the passage in its version's index
    pub ordinal: usize,
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
    /// `1 - squared L2 distance`; 1.0 for an exact match, may be negative
    pub similarity_score: f32,
}

impl RetrievedPassage {
    fn from_hit(rank: usize, hit: PassageHit) -> Self {
        Self {
            rank,
            ordinal: hit.result.ordinal,
            similarity_score: hit.result.similarity(),
            text: hit.passage.text,
            start_pos: hit.passage.start_pos,
            end_pos: hit.passage.end_pos,
        }
    }
}

#[derive(Debug)]
struct LoadedIndex {
    version_id: String,
    store: Arc<IndexStore>,
}

/// Answers queries against the current version of one story.
#[derive(Debug)]
pub struct Retriever {
    embedder: BatchEmbedder,
    versions: VersionManager,
    profiles: ProfileStore,
    loaded: RwLock<Option<LoadedIndex>>,
}

impl Retriever {
    pub fn new(story_path: impl Into<PathBuf>, embedder: BatchEmbedder) -> Result<Self, RetrievalError> {
        let story_path = story_path.into();
        let profiles = ProfileStore::new(&story_path);
        let versions = VersionManager::new(story_path)?;
        Ok(Self {
            embedder,
            versions,
            profiles,
            loaded: RwLock::new(None),
        })
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Version the next query will be answered from.
    pub fn current_version(&self) -> Result<String, RetrievalError> {
        self.versions
            .get_current_version()?
            .ok_or(RetrievalError::NoCurrentVersion)
    }

    /// Up to `k` passages nearest to `query`.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let store = self.current_index()?;
        let embedding = self.embedder.embed_query(query)?;

        let passages: Vec<RetrievedPassage> = store
            .search_passages(&embedding, k)?
            .into_iter()
            .enumerate()
            .map(|(i, hit)| RetrievedPassage::from_hit(i + 1, hit))
            .collect();

        debug!(query, k, returned = passages.len(), "Retrieved passages");
        Ok(passages)
    }

    /// Passages about a character, found by name or alias.
    pub fn get_character_context(
        &self,
        name: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let profile = self.profiles.find(name)?;
        self.retrieve(&character_query(name, profile.as_ref()), k)
    }

    /// Passages about how two characters relate.
    pub fn get_relationship_context(
        &self,
        a: &str,
        b: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let query = match (self.profiles.find(a)?, self.profiles.find(b)?) {
            (Some(pa), Some(pb)) => relationship_query(a, b, Some((&pa, &pb))),
            _ => relationship_query(a, b, None),
        };
        self.retrieve(&query, k)
    }

    pub fn get_plot_context(
        &self,
        plot_point: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        self.retrieve(&plot_query(plot_point), k)
    }

    /// Index of the current version, loading it if the cached one is stale.
    fn current_index(&self) -> Result<Arc<IndexStore>, RetrievalError> {
        let version_id = self.current_version()?;

        if let Some(loaded) = self.read_loaded().as_ref() {
            if loaded.version_id == version_id {
                return Ok(Arc::clone(&loaded.store));
            }
        }

        let artifacts = self.versions.layout().version_artifacts(&version_id);
        if !artifacts.is_populated() {
            return Err(RetrievalError::MissingIndex(version_id));
        }
        let store = Arc::new(IndexStore::load(&artifacts.index_dir)?);

        info!(version = %version_id, passages = store.len(), "Loaded index");
        *self.write_loaded() = Some(LoadedIndex {
            version_id,
            store: Arc::clone(&store),
        });
        Ok(store)
    }

    fn read_loaded(&self) -> RwLockReadGuard<'_, Option<LoadedIndex>> {
        self.loaded.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_loaded(&self) -> RwLockWriteGuard<'_, Option<LoadedIndex>> {
        self.loaded.write().unwrap_or_else(|e| e.into_inner())
    }
}
