//! Character profile extraction through the LLM collaborator.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ProfileError;
use crate::json::parse_json_object;
use crate::llm::LlmClient;
use crate::merge::merge_profile;
use crate::profile::CharacterProfile;
use crate::prompts::{profile_prompt, PROFILE_SYSTEM_PROMPT};

/// Asks the model for profiles and turns its reply into validated profiles.
#[derive(Clone)]
pub struct ProfileExtractor {
    llm: Arc<dyn LlmClient>,
}

impl ProfileExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Profiles mentioned in `text`, keyed by canonical name.
    ///
    /// Fails only if the reply holds no JSON object. Entries that do not
    /// parse or validate are skipped with a warning.
    pub async fn extract(
        &self,
        text: &str,
    ) -> Result<BTreeMap<String, CharacterProfile>, ProfileError> {
        let reply = self
            .llm
            .complete(PROFILE_SYSTEM_PROMPT, &profile_prompt(text))
            .await?;
        let profiles = parse_profiles(&reply)?;
        info!(characters = profiles.len(), "Extracted character profiles");
        Ok(profiles)
    }
}

/// Parse a model reply mapping names to profiles.
///
/// Entries that resolve to the same name are merged in reply order.
pub fn parse_profiles(reply: &str) -> Result<BTreeMap<String, CharacterProfile>, ProfileError> {
    let object = parse_json_object(reply)?;
    let mut profiles = BTreeMap::new();

    for (key, value) in object {
        match profile_from_entry(&key, value) {
            Ok(profile) => {
                let profile = match profiles.remove(&profile.name) {
                    Some(earlier) => merge_profile(&earlier, profile, Utc::now()),
                    None => profile,
                };
                profiles.insert(profile.name.clone(), profile);
            }
            Err(e) => warn!(character = %key, error = %e, "Skipping character"),
        }
    }
    Ok(profiles)
}

fn profile_from_entry(key: &str, value: Value) -> Result<CharacterProfile, ProfileError> {
    let mut profile: CharacterProfile = serde_json::from_value(value)?;

    if profile.name.trim().is_empty() {
        profile.name = key.to_string();
    } else if profile.name != key {
        debug!(key, name = %profile.name, "Profile name differs from key, using name");
    }
    profile.name = profile.name.trim().to_string();

    profile.validate()?;
    Ok(profile)
}
