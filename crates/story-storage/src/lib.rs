//! # story-storage
//!
//! Durable storage for story artifacts.
//!
//! - [`StoryLayout`]: where every artifact of a story lives on disk
//! - [`atomic_write`] and friends: temp-file-then-rename commits
//! - [`VersionManager`]: immutable, copy-forward index snapshots with a
//!   registry of versions and a current pointer

pub mod error;
pub mod fsutil;
pub mod layout;
pub mod registry;
pub mod version;

pub use error::StorageError;
pub use fsutil::{atomic_write, copy_dir_all, read_json, write_json_atomic};
pub use layout::{
    ArtifactPaths, StoryLayout, ELEMENTS_FILE, INDEX_DIR, INDEX_FILE, METADATA_FILE,
    PASSAGES_FILE, PROFILES_FILE, REGISTRY_FILE, VERSIONS_DIR,
};
pub use registry::{next_version_id, VersionMeta, VersionRegistry, VERSION_ID_FORMAT};
pub use version::VersionManager;
