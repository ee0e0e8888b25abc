//! Query text for character, relationship and plot lookups.

use std::collections::BTreeSet;

use story_profiles::CharacterProfile;

/// Kinds of tie between two characters, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationshipHint {
    Romantic,
    Friendship,
    Conflict,
    Family,
}

impl RelationshipHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipHint::Romantic => "romantic",
            RelationshipHint::Friendship => "friendship",
            RelationshipHint::Conflict => "conflict",
            RelationshipHint::Family => "family",
        }
    }
}

/// Query for a character. Known profiles add role, traits and goals.
pub fn character_query(name: &str, profile: Option<&CharacterProfile>) -> String {
    let Some(profile) = profile else {
        return format!("Character: {}", name);
    };

    let mut parts = vec![format!("Character: {}", profile.name)];
    if !profile.role.trim().is_empty() {
        parts.push(format!("Role: {}", profile.role));
    }
    if !profile.personality_traits.is_empty() {
        parts.push(format!("Traits: {}", join(&profile.personality_traits)));
    }
    if !profile.goals.is_empty() {
        parts.push(format!("Goals: {}", join(&profile.goals)));
    }
    parts.join(". ")
}

/// Ties between `a` and `b` listed on either side.
pub fn relationship_hints(a: &CharacterProfile, b: &CharacterProfile) -> Vec<RelationshipHint> {
    let mut hints = BTreeSet::new();
    for (from, to) in [(a, b), (b, a)] {
        if mentions(&from.lovers, to) {
            hints.insert(RelationshipHint::Romantic);
        }
        if mentions(&from.friends, to) {
            hints.insert(RelationshipHint::Friendship);
        }
        if mentions(&from.enemies, to) {
            hints.insert(RelationshipHint::Conflict);
        }
        if from.family.iter().any(|rel| to.answers_to(&rel.name)) {
            hints.insert(RelationshipHint::Family);
        }
    }
    hints.into_iter().collect()
}

/// Query naming both characters, with hints when both profiles are known.
pub fn relationship_query(
    a: &str,
    b: &str,
    profiles: Option<(&CharacterProfile, &CharacterProfile)>,
) -> String {
    let query = format!("Relationship between {} and {}", a, b);
    let hints = profiles
        .map(|(pa, pb)| relationship_hints(pa, pb))
        .unwrap_or_default();
    if hints.is_empty() {
        return query;
    }

    let labels: Vec<&str> = hints.iter().map(RelationshipHint::as_str).collect();
    format!("{}. Relationship: {}", query, labels.join(", "))
}

pub fn plot_query(plot_point: &str) -> String {
    format!("Plot point: {}", plot_point)
}

fn mentions(names: &BTreeSet<String>, profile: &CharacterProfile) -> bool {
    names.iter().any(|name| profile.answers_to(name))
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
