//! Passage metadata aligned with index ordinals.
//!
//! Entry `i` describes the vector at ordinal `i`. Stored as a pretty JSON
//! array of `{text, start_pos, end_pos}` next to the index file.

use std::path::Path;

use story_storage::{read_json, write_json_atomic};
use story_types::PassageMeta;
use tracing::debug;

use crate::error::VectorError;

/// Ordered metadata for the vectors of one index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    entries: Vec<PassageMeta>,
}

impl MetadataStore {
    pub fn new(entries: Vec<PassageMeta>) -> Self {
        Self { entries }
    }

    pub fn get(&self, ordinal: usize) -> Option<&PassageMeta> {
        self.entries.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PassageMeta] {
        &self.entries
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorError> {
        write_json_atomic(path, &self.entries)?;
        debug!(path = ?path, entries = self.entries.len(), "Saved passage metadata");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, VectorError> {
        let entries: Vec<PassageMeta> = read_json(path)?;
        debug!(path = ?path, entries = entries.len(), "Loaded passage metadata");
        Ok(Self { entries })
    }
}
