//! Prompt templates for extraction requests.

pub const PROFILE_SYSTEM_PROMPT: &str =
    "You are a literary analyst specializing in character development. Always respond with valid JSON.";

pub const ELEMENTS_SYSTEM_PROMPT: &str =
    "You are a story analysis assistant. Always respond with valid JSON.";

/// Prompt asking for one profile per character, keyed by name.
pub fn profile_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following story text and extract detailed character profiles.
For each character mentioned, create a profile with:

- name: canonical name
- aliases: other names or titles
- role: narrative or mythic role
- occupation: what they do
- personality_traits: core emotional and behavioral traits
- goals: personal motivations
- fears: deepest anxieties
- lovers: romantic links
- friends: allies
- enemies: conflicts
- family: list of {{"relation_type", "name"}} objects
- key_events: important scenes they appear in
- profile_text: a short canonical summary

Respond with one JSON object whose keys are character names and whose values
are profiles:
{{
  "CharacterName": {{
    "name": "CharacterName",
    "aliases": ["Alias"],
    "role": "Protagonist",
    "occupation": "Occupation",
    "personality_traits": ["Trait"],
    "goals": ["Goal"],
    "fears": ["Fear"],
    "lovers": [],
    "friends": ["Friend"],
    "enemies": ["Enemy"],
    "family": [{{"relation_type": "parent", "name": "ParentName"}}],
    "key_events": ["Event"],
    "profile_text": "Summary"
  }}
}}

Story text:
{text}"#
    )
}

/// Prompt asking for style, characters, world and themes.
pub fn elements_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following story text and describe its core elements.

Respond with one JSON object:
{{
  "style": {{"tone": "...", "pacing": "...", "narrative_style": "..."}},
  "characters": {{"Name": {{"role": "...", "traits": ["..."], "arc": "..."}}}},
  "world": {{"setting": "...", "rules": ["..."], "atmosphere": "..."}},
  "themes": ["..."]
}}

Story text:
{text}"#
    )
}
