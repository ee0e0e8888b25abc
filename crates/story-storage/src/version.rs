//! Versioned index snapshots.
//!
//! Each snapshot lives in `versions/<id>/` and is immutable once registered.
//! Creating a snapshot copies the current one forward; reverting copies a
//! snapshot back to the story root and repoints `current_version`.
//!
//! Single-writer: callers must not run two managers on one story concurrently.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::fsutil::{copy_dir_all, read_json, write_json_atomic};
use crate::layout::{ArtifactPaths, StoryLayout};
use crate::registry::{next_version_id, VersionMeta, VersionRegistry};

/// Manages snapshots of one story directory.
#[derive(Debug, Clone)]
pub struct VersionManager {
    layout: StoryLayout,
}

impl VersionManager {
    /// Open the story at `story_path`, creating its directories and an empty
    /// registry if they do not exist yet.
    pub fn new(story_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let layout = StoryLayout::new(story_path);
        fs::create_dir_all(layout.versions_dir())?;

        let manager = Self { layout };
        if !manager.layout.registry_path().exists() {
            manager.save_registry(&VersionRegistry::default())?;
        }
        Ok(manager)
    }

    pub fn layout(&self) -> &StoryLayout {
        &self.layout
    }

    /// Load the registry. A missing or unreadable registry is replaced with an
    /// empty one.
    pub fn load_registry(&self) -> Result<VersionRegistry, StorageError> {
        let path = self.layout.registry_path();
        if !path.exists() {
            warn!(path = ?path, "Version registry missing, reinitializing");
            let registry = VersionRegistry::default();
            self.save_registry(&registry)?;
            return Ok(registry);
        }

        match read_json::<VersionRegistry>(&path) {
            Ok(registry) => Ok(registry),
            Err(StorageError::Serialization(e)) => {
                warn!(path = ?path, error = %e, "Version registry corrupt, reinitializing");
                let registry = VersionRegistry::default();
                self.save_registry(&registry)?;
                Ok(registry)
            }
            Err(e) => Err(e),
        }
    }

    fn save_registry(&self, registry: &VersionRegistry) -> Result<(), StorageError> {
        write_json_atomic(&self.layout.registry_path(), registry)
    }

    /// Create a new snapshot and make it current. Returns its id.
    ///
    /// The previous current snapshot's artifacts are copied into the new
    /// directory. The registry only learns about the snapshot after its
    /// directory is fully in place.
    pub fn create_version(&self, description: &str) -> Result<String, StorageError> {
        self.create_version_with(description, |_| Ok::<(), StorageError>(()))
    }

    /// Like [`create_version`](Self::create_version), but lets `write`
    /// add or overwrite artifacts in the staged copy before it is committed.
    /// If `write` fails, nothing is registered and the staging is removed.
    pub fn create_version_with<F, E>(&self, description: &str, write: F) -> Result<String, E>
    where
        F: FnOnce(&ArtifactPaths) -> Result<(), E>,
        E: From<StorageError>,
    {
        let mut registry = self.load_registry()?;
        let version_id = next_version_id(Utc::now(), registry.last().map(|v| v.id.as_str()));

        let target = self.layout.version_dir(&version_id);
        if target.exists() {
            // Left over from an interrupted run; never registered.
            warn!(version_id = %version_id, "Removing unregistered version directory");
            fs::remove_dir_all(&target).map_err(StorageError::from)?;
        }

        let staging = self.layout.staging_dir(&version_id);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(StorageError::from)?;
        }
        fs::create_dir_all(&staging).map_err(StorageError::from)?;

        let staged = self
            .populate_staging(&registry, &staging)
            .map_err(E::from)
            .and_then(|()| write(&ArtifactPaths::in_dir(staging.clone())));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &target) {
            let _ = fs::remove_dir_all(&staging);
            return Err(StorageError::from(e).into());
        }

        registry.versions.push(VersionMeta {
            id: version_id.clone(),
            description: description.to_string(),
            created_at: Utc::now(),
        });
        registry.current_version = Some(version_id.clone());
        self.save_registry(&registry)?;

        info!(version_id = %version_id, description, "Created version");
        Ok(version_id)
    }

    fn populate_staging(
        &self,
        registry: &VersionRegistry,
        staging: &Path,
    ) -> Result<(), StorageError> {
        let Some(current) = registry.current_version.as_deref() else {
            return Ok(());
        };
        if !registry.has_valid_current() {
            warn!(version_id = current, "Current version is not registered, starting empty");
            return Ok(());
        }

        let source = self.layout.version_dir(current);
        if !source.is_dir() {
            warn!(version_id = current, "Current version directory missing, starting empty");
            return Ok(());
        }

        let copied = copy_dir_all(&source, staging)?;
        debug!(from = current, files = copied, "Copied artifacts forward");
        Ok(())
    }

    /// Id of the current snapshot, if any.
    pub fn get_current_version(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load_registry()?.current_version)
    }

    /// Make `version_id` current and copy its artifacts to the story root.
    ///
    /// Returns `false` without changing anything if the id is unknown.
    pub fn revert_to_version(&self, version_id: &str) -> Result<bool, StorageError> {
        let mut registry = self.load_registry()?;
        if !registry.contains(version_id) {
            warn!(version_id, "Cannot revert to unknown version");
            return Ok(false);
        }

        let source = self.layout.version_dir(version_id);
        if source.is_dir() {
            let copied = copy_dir_all(&source, self.layout.root())?;
            debug!(version_id, files = copied, "Restored head artifacts");
        } else {
            warn!(version_id, "Version directory missing, head left unchanged");
        }

        registry.current_version = Some(version_id.to_string());
        self.save_registry(&registry)?;

        info!(version_id, "Reverted to version");
        Ok(true)
    }

    /// All snapshots in creation order.
    pub fn list_versions(&self) -> Result<Vec<VersionMeta>, StorageError> {
        Ok(self.load_registry()?.versions)
    }

    pub fn get_version(&self, version_id: &str) -> Result<VersionMeta, StorageError> {
        self.load_registry()?
            .get(version_id)
            .cloned()
            .ok_or_else(|| StorageError::VersionNotFound(version_id.to_string()))
    }

    pub fn latest_version(&self) -> Result<Option<VersionMeta>, StorageError> {
        Ok(self.load_registry()?.versions.pop())
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.layout.version_dir(version_id)
    }

    /// Directory of the current snapshot, if any.
    pub fn current_version_dir(&self) -> Result<Option<PathBuf>, StorageError> {
        Ok(self
            .get_current_version()?
            .map(|id| self.layout.version_dir(&id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, VersionManager) {
        let temp = TempDir::new().unwrap();
        let manager = VersionManager::new(temp.path().join("story")).unwrap();
        (temp, manager)
    }

    #[test]
    fn test_new_initializes_empty_registry() {
        let (_temp, manager) = manager();
        assert!(manager.layout().registry_path().exists());
        assert!(manager.get_current_version().unwrap().is_none());
        assert!(manager.list_versions().unwrap().is_empty());
    }

    #[test]
    fn test_create_versions_are_increasing_and_last_is_current() {
        let (_temp, manager) = manager();

        let ids: Vec<String> = (0..5)
            .map(|i| manager.create_version(&format!("v{}", i)).unwrap())
            .collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }

        let listed: Vec<String> = manager
            .list_versions()
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(listed, ids);
        assert_eq!(manager.get_current_version().unwrap(), ids.last().cloned());
        for id in &ids {
            assert!(manager.version_dir(id).is_dir());
        }
    }

    #[test]
    fn test_create_copies_current_forward() {
        let (_temp, manager) = manager();
        let first = manager.create_version("first").unwrap();
        let first_dir = manager.version_dir(&first);
        fs::create_dir_all(first_dir.join("faiss_index")).unwrap();
        fs::write(first_dir.join("passages.json"), b"[]").unwrap();
        fs::write(first_dir.join("faiss_index").join("index.flat"), b"idx").unwrap();

        let second = manager.create_version("second").unwrap();
        let second_dir = manager.version_dir(&second);
        assert_eq!(fs::read(second_dir.join("passages.json")).unwrap(), b"[]");
        assert_eq!(
            fs::read(second_dir.join("faiss_index").join("index.flat")).unwrap(),
            b"idx"
        );

        // No staging left behind
        let hidden = fs::read_dir(manager.layout().versions_dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with('.')
            })
            .count();
        assert_eq!(hidden, 0);
    }

    #[test]
    fn test_create_with_missing_current_dir_starts_empty() {
        let (_temp, manager) = manager();
        let first = manager.create_version("first").unwrap();
        fs::remove_dir_all(manager.version_dir(&first)).unwrap();

        let second = manager.create_version("second").unwrap();
        assert!(manager.version_dir(&second).is_dir());
        assert_eq!(fs::read_dir(manager.version_dir(&second)).unwrap().count(), 0);
    }

    #[test]
    fn test_create_with_unregistered_current_starts_empty() {
        let (_temp, manager) = manager();
        let stray = manager.version_dir("ghost");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("passages.json"), b"[]").unwrap();
        fs::write(
            manager.layout().registry_path(),
            r#"{"current_version": "ghost", "versions": []}"#,
        )
        .unwrap();

        let created = manager.create_version("fresh").unwrap();
        assert_eq!(fs::read_dir(manager.version_dir(&created)).unwrap().count(), 0);
        assert_eq!(manager.get_current_version().unwrap(), Some(created));
    }

    #[test]
    fn test_revert_unknown_returns_false() {
        let (_temp, manager) = manager();
        let id = manager.create_version("only").unwrap();

        assert!(!manager.revert_to_version("19700101_000000_000").unwrap());
        assert_eq!(manager.get_current_version().unwrap(), Some(id));
    }

    #[test]
    fn test_revert_restores_head_and_keeps_target() {
        let (_temp, manager) = manager();
        let first = manager.create_version("first").unwrap();
        fs::write(manager.version_dir(&first).join("passages.json"), b"first").unwrap();

        let second = manager.create_version("second").unwrap();
        fs::write(manager.version_dir(&second).join("passages.json"), b"second").unwrap();

        assert!(manager.revert_to_version(&first).unwrap());
        assert_eq!(manager.get_current_version().unwrap(), Some(first.clone()));

        let head = manager.layout().head_artifacts();
        assert_eq!(fs::read(&head.passages).unwrap(), b"first");
        assert_eq!(
            fs::read(manager.version_dir(&first).join("passages.json")).unwrap(),
            b"first"
        );
        assert_eq!(manager.list_versions().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_registry_is_reinitialized() {
        let (_temp, manager) = manager();
        manager.create_version("doomed").unwrap();
        fs::write(manager.layout().registry_path(), b"{{{ garbage").unwrap();

        assert!(manager.list_versions().unwrap().is_empty());
        assert!(manager.get_current_version().unwrap().is_none());

        let id = manager.create_version("fresh").unwrap();
        assert_eq!(manager.get_current_version().unwrap(), Some(id));
    }

    #[test]
    fn test_deleted_registry_is_reinitialized() {
        let (_temp, manager) = manager();
        manager.create_version("doomed").unwrap();
        fs::remove_file(manager.layout().registry_path()).unwrap();

        assert!(manager.list_versions().unwrap().is_empty());
        assert!(manager.layout().registry_path().exists());
    }

    #[test]
    fn test_get_version_not_found() {
        let (_temp, manager) = manager();
        let id = manager.create_version("described").unwrap();

        assert_eq!(manager.get_version(&id).unwrap().description, "described");
        assert!(matches!(
            manager.get_version("missing"),
            Err(StorageError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_latest_and_current_dir() {
        let (_temp, manager) = manager();
        assert!(manager.latest_version().unwrap().is_none());
        assert!(manager.current_version_dir().unwrap().is_none());

        manager.create_version("a").unwrap();
        let b = manager.create_version("b").unwrap();

        assert_eq!(manager.latest_version().unwrap().unwrap().id, b);
        assert_eq!(
            manager.current_version_dir().unwrap(),
            Some(manager.version_dir(&b))
        );
    }

    #[test]
    fn test_create_version_with_writes_into_snapshot() {
        let (_temp, manager) = manager();
        let id = manager
            .create_version_with("written", |artifacts| {
                fs::write(&artifacts.passages, b"[1]").map_err(StorageError::from)
            })
            .unwrap();

        let artifacts = manager.layout().version_artifacts(&id);
        assert_eq!(fs::read(&artifacts.passages).unwrap(), b"[1]");
    }

    #[test]
    fn test_failed_write_registers_nothing() {
        let (_temp, manager) = manager();
        let first = manager.create_version("first").unwrap();

        let result = manager.create_version_with("broken", |_| {
            Err(StorageError::InvalidPath("refused".to_string()))
        });
        assert!(result.is_err());

        assert_eq!(manager.list_versions().unwrap().len(), 1);
        assert_eq!(manager.get_current_version().unwrap(), Some(first));
        assert_eq!(fs::read_dir(manager.layout().versions_dir()).unwrap().count(), 1);
    }
}
