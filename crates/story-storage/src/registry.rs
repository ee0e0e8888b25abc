//! Version registry persisted as `index_registry.json`.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Format of version ids: UTC, millisecond precision, fixed width.
pub const VERSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// One registered snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered list of snapshots plus the current pointer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionRegistry {
    #[serde(default)]
    pub current_version: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionMeta>,
}

impl VersionRegistry {
    pub fn contains(&self, version_id: &str) -> bool {
        self.get(version_id).is_some()
    }

    pub fn get(&self, version_id: &str) -> Option<&VersionMeta> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    /// Most recently created version.
    pub fn last(&self) -> Option<&VersionMeta> {
        self.versions.last()
    }

    /// True if `current_version` names a registered version.
    pub fn has_valid_current(&self) -> bool {
        self.current_version
            .as_deref()
            .is_some_and(|id| self.contains(id))
    }
}

/// Derive an id for a snapshot taken at `now` that sorts strictly after `last`.
///
/// Ids compare lexicographically in creation order. When the clock has not
/// advanced past `last` the id is `last + 1ms`; a `last` in an unknown format
/// gets a numeric suffix instead.
pub fn next_version_id(now: DateTime<Utc>, last: Option<&str>) -> String {
    let candidate = now.format(VERSION_ID_FORMAT).to_string();

    let Some(last) = last else {
        return candidate;
    };
    if candidate.as_str() > last {
        return candidate;
    }

    match NaiveDateTime::parse_from_str(last, VERSION_ID_FORMAT) {
        Ok(parsed) => (parsed + TimeDelta::milliseconds(1))
            .format(VERSION_ID_FORMAT)
            .to_string(),
        Err(_) => format!("{}_1", last),
    }
}
