//! Profile merge rules.
//!
//! - list fields: set union
//! - `role`, `occupation`, `profile_text`: the strictly longer text wins
//! - `family`: union keyed by `(relation_type, name)`
//! - `created_at` kept, `updated_at` set to the merge time
//! - `style_embedding`: the new one if present

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::profile::CharacterProfile;

fn union<T: Ord + Clone>(a: &BTreeSet<T>, b: BTreeSet<T>) -> BTreeSet<T> {
    let mut merged = a.clone();
    merged.extend(b);
    merged
}

fn longer(old: &str, new: String) -> String {
    if new.chars().count() > old.chars().count() {
        new
    } else {
        old.to_string()
    }
}

fn longer_opt(old: &Option<String>, new: Option<String>) -> Option<String> {
    match new {
        Some(text) => {
            let old_len = old.as_deref().map_or(0, |t| t.chars().count());
            if text.chars().count() > old_len {
                Some(text)
            } else {
                old.clone()
            }
        }
        None => old.clone(),
    }
}

/// Merge `new` into `existing`, stamping `updated_at` with `now`.
pub fn merge_profile(
    existing: &CharacterProfile,
    new: CharacterProfile,
    now: DateTime<Utc>,
) -> CharacterProfile {
    CharacterProfile {
        name: existing.name.clone(),
        aliases: union(&existing.aliases, new.aliases),
        role: longer(&existing.role, new.role),
        occupation: longer(&existing.occupation, new.occupation),
        personality_traits: union(&existing.personality_traits, new.personality_traits),
        goals: union(&existing.goals, new.goals),
        fears: union(&existing.fears, new.fears),
        lovers: union(&existing.lovers, new.lovers),
        friends: union(&existing.friends, new.friends),
        enemies: union(&existing.enemies, new.enemies),
        family: union(&existing.family, new.family),
        key_events: union(&existing.key_events, new.key_events),
        profile_text: longer_opt(&existing.profile_text, new.profile_text),
        style_embedding: new
            .style_embedding
            .or_else(|| existing.style_embedding.clone()),
        created_at: existing.created_at,
        updated_at: now,
    }
}

/// Merge a batch of new profiles into `existing`, keyed by name.
/// Names not yet known are inserted verbatim.
pub fn merge_all(
    existing: &mut BTreeMap<String, CharacterProfile>,
    new: BTreeMap<String, CharacterProfile>,
    now: DateTime<Utc>,
) {
    for (name, profile) in new {
        let merged = match existing.get(&name) {
            Some(current) => merge_profile(current, profile, now),
            None => profile,
        };
        existing.insert(name, merged);
    }
}
