//! Story ingestion pipeline.
//!
//! Turns raw story text into a new index snapshot:
//! 1. Split into passages
//! 2. Embed every passage
//! 3. Build the flat index
//! 4. Stage a new version and write passages, index and metadata into it
//!
//! Nothing is registered unless all four steps succeed.

use std::path::PathBuf;

use story_embeddings::BatchEmbedder;
use story_storage::{StorageError, StoryLayout, VersionManager};
use story_types::{Passage, StoryConfig};
use story_vector::IndexStore;
use tracing::info;

use crate::error::IngestError;
use crate::splitter::{load_passages, save_passages, TextSplitter};

/// Counts from one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub version_id: String,
    pub passages: usize,
    pub characters: usize,
}

/// Indexes story text into versioned snapshots of one story directory.
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    splitter: TextSplitter,
    embedder: BatchEmbedder,
    versions: VersionManager,
}

impl IngestPipeline {
    pub fn new(
        story_path: impl Into<PathBuf>,
        config: &StoryConfig,
        embedder: BatchEmbedder,
    ) -> Result<Self, IngestError> {
        config.validate()?;
        if embedder.dimension() != config.embedding_dimension {
            return Err(IngestError::InvalidConfig(format!(
                "embedder produces {}-dimensional vectors, config expects {}",
                embedder.dimension(),
                config.embedding_dimension
            )));
        }
        let splitter = TextSplitter::from_config(config)?;
        let versions = VersionManager::new(story_path)?;

        Ok(Self {
            splitter,
            embedder,
            versions,
        })
    }

    pub fn versions(&self) -> &VersionManager {
        &self.versions
    }

    pub fn layout(&self) -> &StoryLayout {
        self.versions.layout()
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Index `text` as a new version and make it current. Returns the version id.
    pub fn process_story(&self, text: &str, description: &str) -> Result<String, IngestError> {
        Ok(self.process_story_with_stats(text, description)?.version_id)
    }

    pub fn process_story_with_stats(
        &self,
        text: &str,
        description: &str,
    ) -> Result<IngestStats, IngestError> {
        let passages = self.splitter.split(text);
        let passages = self.embedder.embed_chunks(passages)?;

        let mut store = IndexStore::new(self.embedder.dimension());
        store.build(&passages)?;

        let version_id = self
            .versions
            .create_version_with(description, |artifacts| {
                save_passages(&artifacts.passages, &passages)?;
                store.save(&artifacts.index_dir)?;
                Ok::<(), IngestError>(())
            })?;

        let stats = IngestStats {
            version_id,
            passages: passages.len(),
            characters: text.chars().count(),
        };
        info!(
            version_id = %stats.version_id,
            passages = stats.passages,
            chars = stats.characters,
            model = self.embedder.model_name(),
            "Indexed story"
        );
        Ok(stats)
    }

    /// Passages and index of a registered version.
    pub fn load_version(&self, version_id: &str) -> Result<(Vec<Passage>, IndexStore), IngestError> {
        self.versions.get_version(version_id)?;

        let artifacts = self.layout().version_artifacts(version_id);
        if !artifacts.is_populated() {
            return Err(StorageError::InvalidPath(format!(
                "version {} has no index at {}",
                version_id,
                artifacts.index_dir.display()
            ))
            .into());
        }

        let passages = load_passages(&artifacts.passages)?;
        let store = IndexStore::load(&artifacts.index_dir)?;
        Ok((passages, store))
    }
}
