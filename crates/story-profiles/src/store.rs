//! Persistent character profiles for one story.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use story_storage::{read_json, write_json_atomic, StoryLayout};

use crate::error::ProfileError;
use crate::extract::ProfileExtractor;
use crate::merge::merge_all;
use crate::profile::CharacterProfile;

/// Profiles file of a story, keyed by canonical name.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store for the story rooted at `story_path`.
    pub fn new(story_path: impl AsRef<Path>) -> Self {
        Self::at(StoryLayout::new(story_path.as_ref()).profiles_path())
    }

    /// Store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored profiles that validate. A missing file yields an empty map.
    pub fn load(&self) -> Result<BTreeMap<String, CharacterProfile>, ProfileError> {
        Ok(self.read_entries()?.valid)
    }

    /// Replace the stored profiles. Stored entries that do not validate are
    /// written back untouched unless `profiles` holds the same name.
    pub fn save(&self, profiles: &BTreeMap<String, CharacterProfile>) -> Result<(), ProfileError> {
        let stored = self.read_entries()?;
        self.write_entries(profiles, &stored.invalid)
    }

    /// Merge `new` into the stored profiles and persist the result.
    ///
    /// Fails without touching the file if the stored profiles cannot be read.
    pub fn merge_all(
        &self,
        new: BTreeMap<String, CharacterProfile>,
    ) -> Result<BTreeMap<String, CharacterProfile>, ProfileError> {
        let StoredProfiles { mut valid, invalid } = self.read_entries()?;
        let incoming = new.len();
        merge_all(&mut valid, new, Utc::now());
        self.write_entries(&valid, &invalid)?;

        info!(incoming, total = valid.len(), "Merged character profiles");
        Ok(valid)
    }

    /// Extract profiles from `text` and merge them into the store.
    pub async fn update_from_text(
        &self,
        extractor: &ProfileExtractor,
        text: &str,
    ) -> Result<BTreeMap<String, CharacterProfile>, ProfileError> {
        let extracted = extractor.extract(text).await?;
        self.merge_all(extracted)
    }

    /// Profile stored under exactly `name`.
    pub fn get(&self, name: &str) -> Result<Option<CharacterProfile>, ProfileError> {
        Ok(self.load()?.remove(name))
    }

    /// Profile whose name or alias matches `name`, ignoring case.
    pub fn find(&self, name: &str) -> Result<Option<CharacterProfile>, ProfileError> {
        let mut profiles = self.load()?;
        if let Some(profile) = profiles.remove(name) {
            return Ok(Some(profile));
        }
        Ok(profiles.into_values().find(|p| p.answers_to(name)))
    }

    /// Names linked to `name`, or empty if the character is unknown.
    pub fn get_network(&self, name: &str) -> Result<Vec<String>, ProfileError> {
        Ok(self.find(name)?.map(|p| p.network()).unwrap_or_default())
    }

    /// Every character's linked names.
    pub fn character_network(&self) -> Result<BTreeMap<String, Vec<String>>, ProfileError> {
        Ok(self
            .load()?
            .into_iter()
            .map(|(name, profile)| (name, profile.network()))
            .collect())
    }

    fn read_entries(&self) -> Result<StoredProfiles, ProfileError> {
        if !self.path.exists() {
            return Ok(StoredProfiles::default());
        }

        let raw: BTreeMap<String, Value> = read_json(&self.path)?;
        let mut stored = StoredProfiles::default();
        for (name, value) in raw {
            let profile = serde_json::from_value::<CharacterProfile>(value.clone())
                .map_err(ProfileError::from)
                .and_then(|p| p.validate().map(|_| p));
            match profile {
                Ok(profile) => {
                    stored.valid.insert(name, profile);
                }
                Err(e) => {
                    warn!(character = %name, error = %e, "Stored profile does not validate, keeping it as is");
                    stored.invalid.insert(name, value);
                }
            }
        }

        debug!(
            path = ?self.path,
            valid = stored.valid.len(),
            invalid = stored.invalid.len(),
            "Loaded profiles"
        );
        Ok(stored)
    }

    fn write_entries(
        &self,
        profiles: &BTreeMap<String, CharacterProfile>,
        invalid: &BTreeMap<String, Value>,
    ) -> Result<(), ProfileError> {
        let mut entries = invalid.clone();
        for (name, profile) in profiles {
            entries.insert(name.clone(), serde_json::to_value(profile)?);
        }
        write_json_atomic(&self.path, &entries)?;
        Ok(())
    }
}

/// Contents of the profiles file.
#[derive(Debug, Default)]
struct StoredProfiles {
    valid: BTreeMap<String, CharacterProfile>,
    /// Entries that do not parse or validate, kept verbatim
    invalid: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::profile::FamilyRelation;
    use std::sync::Arc;
    use story_storage::StorageError;
    use tempfile::TempDir;

    fn ahab() -> CharacterProfile {
        let mut p = CharacterProfile::new("Ahab", "Captain");
        p.aliases.insert("Old Thunder".to_string());
        p.enemies.insert("Moby Dick".to_string());
        p.friends.insert("Starbuck".to_string());
        p
    }

    fn batch(profiles: Vec<CharacterProfile>) -> BTreeMap<String, CharacterProfile> {
        profiles.into_iter().map(|p| (p.name.clone(), p)).collect()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load().unwrap().is_empty());
        assert!(store.get("Ahab").unwrap().is_none());
        assert!(store.get_network("Ahab").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_fails_merge_and_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        store.merge_all(batch(vec![ahab()])).unwrap();

        let mut bytes = std::fs::read(store.path()).unwrap();
        bytes.push(b'x');
        std::fs::write(store.path(), &bytes).unwrap();

        assert!(matches!(
            store.load(),
            Err(ProfileError::Storage(StorageError::Serialization(_)))
        ));
        let ishmael = CharacterProfile::new("Ishmael", "Narrator");
        assert!(store.merge_all(batch(vec![ishmael])).is_err());
        assert_eq!(std::fs::read(store.path()).unwrap(), bytes);
    }

    #[test]
    fn test_invalid_stored_entry_survives_merge() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        std::fs::write(
            store.path(),
            r#"{"Ahab": {"name": "Ahab", "role": "Captain"}, "Ghost": {"name": "Ghost", "mood": "restless"}}"#,
        )
        .unwrap();

        let profiles = store.load().unwrap();
        assert_eq!(profiles.len(), 1);
        assert!(profiles.contains_key("Ahab"));

        store
            .merge_all(batch(vec![CharacterProfile::new("Ishmael", "Narrator")]))
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["Ghost"], serde_json::json!({"name": "Ghost", "mood": "restless"}));
        assert_eq!(raw["Ishmael"]["role"], "Narrator");
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_merge_all_persists_and_preserves_created_at() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());

        store.merge_all(batch(vec![ahab()])).unwrap();
        let first = store.get("Ahab").unwrap().unwrap();

        let mut update = CharacterProfile::new("Ahab", "Captain of the Pequod");
        update.family.insert(FamilyRelation::new("wife", "Wife"));
        store.merge_all(batch(vec![update])).unwrap();

        let merged = store.get("Ahab").unwrap().unwrap();
        assert_eq!(merged.created_at, first.created_at);
        assert!(merged.updated_at >= first.updated_at);
        assert_eq!(merged.role, "Captain of the Pequod");
        assert!(merged.aliases.contains("Old Thunder"));
        assert!(merged.family.contains(&FamilyRelation::new("wife", "Wife")));
    }

    #[test]
    fn test_find_by_alias() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        store.merge_all(batch(vec![ahab()])).unwrap();

        assert_eq!(store.find("old thunder").unwrap().unwrap().name, "Ahab");
        assert!(store.find("Queequeg").unwrap().is_none());
    }

    #[test]
    fn test_networks() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        let mut starbuck = CharacterProfile::new("Starbuck", "First mate");
        starbuck.friends.insert("Ahab".to_string());
        store.merge_all(batch(vec![ahab(), starbuck])).unwrap();

        assert_eq!(store.get_network("Ahab").unwrap(), vec!["Moby Dick", "Starbuck"]);

        let network = store.character_network().unwrap();
        assert_eq!(network.len(), 2);
        assert_eq!(network["Starbuck"], vec!["Ahab"]);
    }

    #[tokio::test]
    async fn test_update_from_text() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path());
        let llm = Arc::new(
            MockLlmClient::new()
                .with_reply(r#"{"Ahab": {"name": "Ahab", "role": "Captain"}}"#)
                .with_reply(r#"{"Ahab": {"role": "Captain", "goals": ["revenge"]}}"#),
        );
        let extractor = ProfileExtractor::new(llm);

        store.update_from_text(&extractor, "chapter one").await.unwrap();
        let profiles = store.update_from_text(&extractor, "chapter two").await.unwrap();

        assert_eq!(profiles.len(), 1);
        assert!(profiles["Ahab"].goals.contains("revenge"));
        assert_eq!(store.load().unwrap(), profiles);
    }
}
