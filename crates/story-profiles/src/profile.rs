//! Character profile model.
//!
//! Set-valued fields are ordered sets so profiles serialize identically no
//! matter what order the model listed things in. The `family` field accepts
//! every shape models actually produce and normalizes it on the way in.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProfileError;

/// Relation label used when the model gives only a name.
pub const UNKNOWN_RELATION: &str = "unknown";

/// One family tie. Two relations are the same if both fields match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FamilyRelation {
    pub relation_type: String,
    pub name: String,
}

impl FamilyRelation {
    pub fn new(relation_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            relation_type: relation_type.into(),
            name: name.into(),
        }
    }
}

/// A character as known so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Canonical name; key in the profile map
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub aliases: BTreeSet<String>,
    /// Narrative role (protagonist, mentor, ...)
    #[serde(default, deserialize_with = "nullable")]
    pub role: String,
    #[serde(default, deserialize_with = "nullable")]
    pub occupation: String,
    #[serde(default, deserialize_with = "nullable")]
    pub personality_traits: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub goals: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub fears: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub lovers: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub friends: BTreeSet<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub enemies: BTreeSet<String>,
    #[serde(default, deserialize_with = "family_relations")]
    pub family: BTreeSet<FamilyRelation>,
    #[serde(default, deserialize_with = "nullable")]
    pub key_events: BTreeSet<String>,
    #[serde(default)]
    pub profile_text: Option<String>,
    #[serde(default)]
    pub style_embedding: Option<Vec<f32>>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl CharacterProfile {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            aliases: BTreeSet::new(),
            role: role.into(),
            occupation: String::new(),
            personality_traits: BTreeSet::new(),
            goals: BTreeSet::new(),
            fears: BTreeSet::new(),
            lovers: BTreeSet::new(),
            friends: BTreeSet::new(),
            enemies: BTreeSet::new(),
            family: BTreeSet::new(),
            key_events: BTreeSet::new(),
            profile_text: None,
            style_embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reject profiles without a name or role.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::Validation(
                "character name cannot be empty".to_string(),
            ));
        }
        if self.role.trim().is_empty() {
            return Err(ProfileError::Validation(format!(
                "character '{}' has no role",
                self.name
            )));
        }
        Ok(())
    }

    /// True if `name` is the canonical name or an alias, ignoring case.
    pub fn answers_to(&self, name: &str) -> bool {
        let wanted = name.trim().to_lowercase();
        self.name.to_lowercase() == wanted
            || self.aliases.iter().any(|a| a.to_lowercase() == wanted)
    }

    /// Names of everyone this character is linked to, sorted and deduplicated.
    pub fn network(&self) -> Vec<String> {
        let related: BTreeSet<&String> = self
            .lovers
            .iter()
            .chain(&self.friends)
            .chain(&self.enemies)
            .chain(self.family.iter().map(|rel| &rel.name))
            .collect();
        related.into_iter().cloned().collect()
    }
}

/// Treat an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 timestamps and offset-less ones, which are taken as UTC.
fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Shapes of `family` seen in model output.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFamily {
    List(Vec<RawRelation>),
    ByRelation(BTreeMap<String, OneOrMany>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRelation {
    Full(FamilyRelation),
    NameOnly(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl RawFamily {
    fn normalize(self) -> Vec<FamilyRelation> {
        match self {
            RawFamily::List(items) => items
                .into_iter()
                .map(|item| match item {
                    RawRelation::Full(rel) => rel,
                    RawRelation::NameOnly(name) => FamilyRelation::new(UNKNOWN_RELATION, name),
                })
                .collect(),
            RawFamily::ByRelation(map) => map
                .into_iter()
                .flat_map(|(relation_type, names)| {
                    let names = match names {
                        OneOrMany::One(name) => vec![name],
                        OneOrMany::Many(names) => names,
                    };
                    names
                        .into_iter()
                        .map(move |name| FamilyRelation::new(relation_type.clone(), name))
                })
                .collect(),
        }
    }
}

fn family_relations<'de, D>(deserializer: D) -> Result<BTreeSet<FamilyRelation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawFamily>::deserialize(deserializer)?;
    Ok(raw
        .map(RawFamily::normalize)
        .unwrap_or_default()
        .into_iter()
        .filter(|rel| !rel.name.trim().is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CharacterProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_minimal_profile_gets_defaults() {
        let profile = parse(json!({"name": "Ahab", "role": "Captain"}));
        assert_eq!(profile.occupation, "");
        assert!(profile.aliases.is_empty());
        assert!(profile.family.is_empty());
        assert!(profile.profile_text.is_none());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_nulls_are_empty() {
        let profile = parse(json!({
            "name": "Ahab",
            "role": "Captain",
            "aliases": null,
            "occupation": null,
            "family": null
        }));
        assert!(profile.aliases.is_empty());
        assert_eq!(profile.occupation, "");
        assert!(profile.family.is_empty());
    }

    #[test]
    fn test_family_list_of_objects() {
        let profile = parse(json!({
            "name": "Ishmael",
            "role": "Narrator",
            "family": [
                {"relation_type": "cousin", "name": "Ned"},
                {"relation_type": "cousin", "name": "Ned"}
            ]
        }));
        assert_eq!(profile.family.len(), 1);
    }

    #[test]
    fn test_family_bare_strings_are_unknown() {
        let profile = parse(json!({
            "name": "Ishmael",
            "role": "Narrator",
            "family": ["Ned", {"relation_type": "aunt", "name": "Charity"}]
        }));
        assert!(profile.family.contains(&FamilyRelation::new("unknown", "Ned")));
        assert!(profile.family.contains(&FamilyRelation::new("aunt", "Charity")));
    }

    #[test]
    fn test_family_keyed_by_relation() {
        let profile = parse(json!({
            "name": "Starbuck",
            "role": "First mate",
            "family": {"wife": "Mary", "children": ["Tom", "Ann"]}
        }));
        let family: Vec<FamilyRelation> = profile.family.into_iter().collect();
        assert_eq!(
            family,
            vec![
                FamilyRelation::new("children", "Ann"),
                FamilyRelation::new("children", "Tom"),
                FamilyRelation::new("wife", "Mary"),
            ]
        );
    }

    #[test]
    fn test_validation() {
        assert!(CharacterProfile::new("", "Captain").validate().is_err());
        assert!(CharacterProfile::new("Ahab", " ").validate().is_err());
        assert!(CharacterProfile::new("Ahab", "Captain").validate().is_ok());
    }

    #[test]
    fn test_naive_timestamps_are_utc() {
        let profile = parse(json!({
            "name": "Ahab",
            "role": "Captain",
            "created_at": "2024-03-01T10:15:30.123456",
            "updated_at": "2024-03-02T08:00:00+00:00"
        }));
        assert_eq!(
            profile.created_at.to_rfc3339(),
            "2024-03-01T10:15:30.123456+00:00"
        );
        assert_eq!(profile.updated_at.to_rfc3339(), "2024-03-02T08:00:00+00:00");
    }

    #[test]
    fn test_answers_to_alias_case_insensitive() {
        let mut profile = CharacterProfile::new("Ahab", "Captain");
        profile.aliases.insert("Old Thunder".to_string());
        assert!(profile.answers_to("ahab"));
        assert!(profile.answers_to("OLD THUNDER"));
        assert!(!profile.answers_to("Starbuck"));
    }

    #[test]
    fn test_network_unions_relations() {
        let mut profile = CharacterProfile::new("Ahab", "Captain");
        profile.friends.insert("Starbuck".to_string());
        profile.enemies.insert("Moby Dick".to_string());
        profile.lovers.insert("Starbuck".to_string());
        profile.family.insert(FamilyRelation::new("wife", "Wife"));

        assert_eq!(profile.network(), vec!["Moby Dick", "Starbuck", "Wife"]);
    }

    #[test]
    fn test_serialized_sets_are_sorted() {
        let mut profile = CharacterProfile::new("Ahab", "Captain");
        profile.goals.insert("revenge".to_string());
        profile.goals.insert("command".to_string());

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["goals"], json!(["command", "revenge"]));
    }
}
