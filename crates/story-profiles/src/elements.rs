//! Story-level elements: style, characters, world and themes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use story_storage::{read_json, write_json_atomic, StorageError, StoryLayout};

use crate::error::ProfileError;
use crate::json::parse_json_object;
use crate::llm::LlmClient;
use crate::prompts::{elements_prompt, ELEMENTS_SYSTEM_PROMPT};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub pacing: String,
    #[serde(default)]
    pub narrative_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<String>,
}

impl CharacterInfo {
    /// Fields present in `new` overwrite ours.
    pub fn update(&mut self, new: CharacterInfo) {
        if new.role.is_some() {
            self.role = new.role;
        }
        if new.traits.is_some() {
            self.traits = new.traits;
        }
        if new.arc.is_some() {
            self.arc = new.arc;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<String>,
}

impl WorldConfig {
    /// Fields present in `new` overwrite ours.
    pub fn update(&mut self, new: WorldConfig) {
        if new.setting.is_some() {
            self.setting = new.setting;
        }
        if new.rules.is_some() {
            self.rules = new.rules;
        }
        if new.atmosphere.is_some() {
            self.atmosphere = new.atmosphere;
        }
    }
}

/// Everything known about a story beyond its characters' profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryElements {
    #[serde(default)]
    pub style: Option<StyleConfig>,
    #[serde(default)]
    pub characters: BTreeMap<String, CharacterInfo>,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub themes: BTreeSet<String>,
}

impl StoryElements {
    /// Fold `new` into `self`.
    ///
    /// Style is replaced wholesale when `new` has one. When `new` has no
    /// style the stored one is kept as is: a chunk that says nothing about
    /// style never clears it, and style fields are never combined across
    /// extractions. Characters and world are updated field by field. Themes
    /// are unioned.
    pub fn merge(&mut self, new: StoryElements) {
        if new.style.is_some() {
            self.style = new.style;
        }
        for (name, info) in new.characters {
            self.characters.entry(name).or_default().update(info);
        }
        self.world.update(new.world);
        self.themes.extend(new.themes);
    }
}

/// Extracts story elements and keeps `story_elements.json` current.
#[derive(Clone)]
pub struct StoryAnalyzer {
    llm: Arc<dyn LlmClient>,
    path: PathBuf,
}

impl StoryAnalyzer {
    pub fn new(story_path: impl AsRef<Path>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            path: StoryLayout::new(story_path.as_ref()).elements_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the model for the elements of `text`.
    pub async fn extract_story_elements(&self, text: &str) -> Result<StoryElements, ProfileError> {
        let reply = self
            .llm
            .complete(ELEMENTS_SYSTEM_PROMPT, &elements_prompt(text))
            .await?;
        let object = parse_json_object(&reply)?;
        Ok(serde_json::from_value(object.into())?)
    }

    /// Stored elements, or empty if none were saved yet.
    pub fn load_story_elements(&self) -> Result<StoryElements, StorageError> {
        if !self.path.exists() {
            return Ok(StoryElements::default());
        }
        read_json(&self.path)
    }

    pub fn save_story_elements(&self, elements: &StoryElements) -> Result<(), StorageError> {
        write_json_atomic(&self.path, elements)
    }

    /// Extract elements from `text`, merge them into the stored ones and save.
    ///
    /// Fails without touching the file if the stored elements cannot be read.
    pub async fn update_story_elements(&self, text: &str) -> Result<StoryElements, ProfileError> {
        let new = self.extract_story_elements(text).await?;

        let mut elements = self.load_story_elements()?;
        elements.merge(new);
        self.save_story_elements(&elements)?;

        info!(
            characters = elements.characters.len(),
            themes = elements.themes.len(),
            "Updated story elements"
        );
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use serde_json::json;
    use tempfile::TempDir;

    fn elements(value: serde_json::Value) -> StoryElements {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_rules() {
        let mut current = elements(json!({
            "style": {"tone": "dark", "pacing": "slow", "narrative_style": "first person"},
            "characters": {"Ahab": {"role": "Captain", "arc": "descent"}},
            "world": {"setting": "Pequod", "atmosphere": "brooding"},
            "themes": ["obsession"]
        }));

        current.merge(elements(json!({
            "characters": {
                "Ahab": {"traits": ["obsessive"], "arc": "doom"},
                "Ishmael": {"role": "Narrator"}
            },
            "world": {"rules": ["whales are real"]},
            "themes": ["fate", "obsession"]
        })));

        assert_eq!(current.style.as_ref().unwrap().tone, "dark");
        let ahab = &current.characters["Ahab"];
        assert_eq!(ahab.role.as_deref(), Some("Captain"));
        assert_eq!(ahab.arc.as_deref(), Some("doom"));
        assert_eq!(ahab.traits, Some(vec!["obsessive".to_string()]));
        assert!(current.characters.contains_key("Ishmael"));
        assert_eq!(current.world.setting.as_deref(), Some("Pequod"));
        assert_eq!(current.world.rules, Some(vec!["whales are real".to_string()]));
        assert_eq!(current.themes.len(), 2);
    }

    #[test]
    fn test_new_style_replaces_old() {
        let mut current = elements(json!({"style": {"tone": "dark"}}));
        current.merge(elements(json!({"style": {"tone": "light", "pacing": "brisk"}})));
        let style = current.style.unwrap();
        assert_eq!(style.tone, "light");
        assert_eq!(style.narrative_style, "");
    }

    #[test]
    fn test_load_absent_is_empty() {
        let dir = TempDir::new().unwrap();
        let analyzer = StoryAnalyzer::new(dir.path(), Arc::new(MockLlmClient::new()));
        assert_eq!(analyzer.load_story_elements().unwrap(), StoryElements::default());
    }

    #[tokio::test]
    async fn test_update_story_elements_accumulates() {
        let dir = TempDir::new().unwrap();
        let llm = Arc::new(
            MockLlmClient::new()
                .with_reply(r#"Sure: {"themes": ["obsession"], "world": {"setting": "Nantucket"}}"#)
                .with_reply(r#"{"themes": ["fate"], "world": {"setting": "The Pequod"}}"#),
        );
        let analyzer = StoryAnalyzer::new(dir.path(), llm);

        analyzer.update_story_elements("one").await.unwrap();
        let updated = analyzer.update_story_elements("two").await.unwrap();

        assert_eq!(updated.world.setting.as_deref(), Some("The Pequod"));
        assert_eq!(
            updated.themes.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["fate", "obsession"]
        );
        assert_eq!(analyzer.load_story_elements().unwrap(), updated);
    }

    #[test]
    fn test_missing_style_keeps_stored_one() {
        let mut current = elements(json!({"style": {"tone": "dark", "pacing": "slow"}}));
        current.merge(elements(json!({"themes": ["fate"]})));
        let style = current.style.unwrap();
        assert_eq!(style.tone, "dark");
        assert_eq!(style.pacing, "slow");
    }

    #[tokio::test]
    async fn test_corrupt_elements_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let analyzer = StoryAnalyzer::new(
            dir.path(),
            Arc::new(MockLlmClient::always(r#"{"themes": ["fate"]}"#)),
        );
        std::fs::write(analyzer.path(), b"{\"themes\": [").unwrap();

        assert!(matches!(
            analyzer.update_story_elements("text").await,
            Err(ProfileError::Storage(StorageError::Serialization(_)))
        ));
        assert_eq!(std::fs::read(analyzer.path()).unwrap(), b"{\"themes\": [");
    }

    #[tokio::test]
    async fn test_malformed_reply_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let analyzer = StoryAnalyzer::new(dir.path(), Arc::new(MockLlmClient::always("nope")));

        assert!(matches!(
            analyzer.update_story_elements("text").await,
            Err(ProfileError::MalformedResponse(_))
        ));
        assert!(!analyzer.path().exists());
    }
}
