//! # story-profiles
//!
//! Character profiles and story elements for a story, extracted by an LLM
//! and merged into what is already known.
//!
//! Profiles only grow: list fields are unioned, text fields keep the longest
//! description seen, and `created_at` never changes after the first sighting.

pub mod elements;
pub mod error;
pub mod extract;
pub mod json;
pub mod llm;
pub mod merge;
pub mod profile;
pub mod prompts;
pub mod store;

pub use elements::{CharacterInfo, StoryAnalyzer, StoryElements, StyleConfig, WorldConfig};
pub use error::ProfileError;
pub use extract::{parse_profiles, ProfileExtractor};
pub use json::parse_json_object;
pub use llm::{ApiLlmClient, ApiLlmConfig, LlmClient, LlmError, LlmProvider, MockLlmClient};
pub use merge::{merge_all, merge_profile};
pub use profile::{CharacterProfile, FamilyRelation, UNKNOWN_RELATION};
pub use store::ProfileStore;
