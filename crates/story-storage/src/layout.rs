//! Durable layout of a story directory.
//!
//! ```text
//! <story>/
//!   index_registry.json
//!   character_profiles.json
//!   story_elements.json
//!   passages.json              head copy, refreshed on revert
//!   faiss_index/               head copy, refreshed on revert
//!   versions/<id>/passages.json
//!   versions/<id>/faiss_index/index.flat
//!   versions/<id>/faiss_index/metadata.json
//! ```

use std::path::{Path, PathBuf};

pub const REGISTRY_FILE: &str = "index_registry.json";
pub const PROFILES_FILE: &str = "character_profiles.json";
pub const ELEMENTS_FILE: &str = "story_elements.json";
pub const VERSIONS_DIR: &str = "versions";
pub const PASSAGES_FILE: &str = "passages.json";
pub const INDEX_DIR: &str = "faiss_index";
pub const INDEX_FILE: &str = "index.flat";
pub const METADATA_FILE: &str = "metadata.json";

const STAGING_PREFIX: &str = ".staging-";

/// Paths inside one story directory.
#[derive(Debug, Clone)]
pub struct StoryLayout {
    root: PathBuf,
}

impl StoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.root.join(PROFILES_FILE)
    }

    pub fn elements_path(&self) -> PathBuf {
        self.root.join(ELEMENTS_FILE)
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join(VERSIONS_DIR)
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    /// Hidden directory a snapshot is assembled in before being renamed into place.
    pub fn staging_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir()
            .join(format!("{}{}", STAGING_PREFIX, version_id))
    }

    /// Artifacts of a registered version.
    pub fn version_artifacts(&self, version_id: &str) -> ArtifactPaths {
        ArtifactPaths::in_dir(self.version_dir(version_id))
    }

    /// Head artifacts used by live components after a revert.
    pub fn head_artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(self.root.clone())
    }
}

/// Artifact file locations relative to a version (or head) directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub passages: PathBuf,
    pub index_dir: PathBuf,
    pub index_file: PathBuf,
    pub metadata_file: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: PathBuf) -> Self {
        let index_dir = dir.join(INDEX_DIR);
        Self {
            passages: dir.join(PASSAGES_FILE),
            index_file: index_dir.join(INDEX_FILE),
            metadata_file: index_dir.join(METADATA_FILE),
            index_dir,
            dir,
        }
    }

    /// True once the index and its metadata have been written.
    pub fn is_populated(&self) -> bool {
        self.index_file.exists() && self.metadata_file.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_paths() {
        let layout = StoryLayout::new("/stories/moby");
        let artifacts = layout.version_artifacts("20240101_120000_000");

        assert_eq!(
            artifacts.passages,
            PathBuf::from("/stories/moby/versions/20240101_120000_000/passages.json")
        );
        assert_eq!(
            artifacts.index_file,
            PathBuf::from("/stories/moby/versions/20240101_120000_000/faiss_index/index.flat")
        );
        assert_eq!(
            artifacts.metadata_file,
            PathBuf::from("/stories/moby/versions/20240101_120000_000/faiss_index/metadata.json")
        );
    }

    #[test]
    fn test_head_paths() {
        let layout = StoryLayout::new("/stories/moby");
        let head = layout.head_artifacts();
        assert_eq!(head.passages, PathBuf::from("/stories/moby/passages.json"));
        assert_eq!(head.index_dir, PathBuf::from("/stories/moby/faiss_index"));
    }

    #[test]
    fn test_staging_dir_is_hidden() {
        let layout = StoryLayout::new("/s");
        let staging = layout.staging_dir("v1");
        let name = staging.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with('.'));
        assert_eq!(staging.parent().unwrap(), layout.versions_dir());
    }
}
