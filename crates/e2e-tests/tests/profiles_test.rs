//! Profile extraction, merging and profile-aware retrieval E2E tests.
//!
//! The LLM collaborator is scripted with MockLlmClient so every reply shape
//! seen in practice (fenced JSON, prose around JSON, odd family layouts) is
//! exercised without network access.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{TestHarness, MOBY_DICK};
use story_profiles::{FamilyRelation, MockLlmClient, ProfileError};

const CHAPTER_ONE: &str = r#"Here is what I found:
```json
{
  "Ahab": {
    "name": "Ahab",
    "aliases": ["Captain Ahab"],
    "role": "Captain",
    "personality_traits": ["obsessive"],
    "enemies": ["Moby Dick"],
    "friends": ["Starbuck"],
    "family": {"wife": "Unnamed wife"}
  },
  "Starbuck": {
    "role": "First mate",
    "enemies": ["Captain Ahab"]
  },
  "Fedallah": {"name": "Fedallah"}
}
```"#;

const CHAPTER_TWO: &str = r#"{
  "Ahab": {
    "name": "Ahab",
    "aliases": ["Old Thunder"],
    "role": "Captain of the Pequod",
    "goals": ["vengeance on the whale that took his leg"],
    "family": [{"relation_type": "wife", "name": "Unnamed wife"}, "Unnamed son"],
    "created_at": "2020-01-01T00:00:00"
  }
}"#;

#[tokio::test]
async fn test_profiles_accumulate_across_chapters() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let llm = Arc::new(
        MockLlmClient::new()
            .with_reply(CHAPTER_ONE)
            .with_reply(CHAPTER_TWO),
    );
    let extractor = harness.extractor(llm.clone());
    let store = harness.profiles();

    let after_one = store.update_from_text(&extractor, "chapter one").await?;
    assert_eq!(after_one.keys().collect::<Vec<_>>(), vec!["Ahab", "Starbuck"]);
    let created = after_one["Ahab"].created_at;

    store.update_from_text(&extractor, "chapter two").await?;
    let ahab = store.get("Ahab")?.expect("Ahab should be stored");

    assert_eq!(ahab.created_at, created);
    assert_eq!(ahab.role, "Captain of the Pequod");
    assert_eq!(
        ahab.aliases.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["Captain Ahab", "Old Thunder"]
    );
    assert_eq!(
        ahab.family.iter().cloned().collect::<Vec<_>>(),
        vec![
            FamilyRelation::new("unknown", "Unnamed son"),
            FamilyRelation::new("wife", "Unnamed wife"),
        ]
    );
    assert!(ahab.personality_traits.contains("obsessive"));
    assert!(ahab.goals.contains("vengeance on the whale that took his leg"));

    assert_eq!(llm.call_count(), 2);
    assert!(llm.prompts()[1].1.contains("chapter two"));
    Ok(())
}

#[tokio::test]
async fn test_networks_after_extraction() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let extractor = harness.extractor(Arc::new(MockLlmClient::always(CHAPTER_ONE)));
    let store = harness.profiles();
    store.update_from_text(&extractor, "chapter one").await?;

    assert_eq!(
        store.get_network("captain ahab")?,
        vec!["Moby Dick", "Starbuck", "Unnamed wife"]
    );
    let network = store.character_network()?;
    assert_eq!(network["Starbuck"], vec!["Captain Ahab"]);
    Ok(())
}

#[tokio::test]
async fn test_malformed_reply_keeps_existing_profiles() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let llm = Arc::new(
        MockLlmClient::new()
            .with_reply(CHAPTER_ONE)
            .with_reply("I'm sorry, I can't find any characters."),
    );
    let extractor = harness.extractor(llm);
    let store = harness.profiles();

    store.update_from_text(&extractor, "chapter one").await?;
    let before = std::fs::read(store.path())?;

    let result = store.update_from_text(&extractor, "chapter two").await;
    assert!(matches!(result, Err(ProfileError::MalformedResponse(_))));
    assert_eq!(std::fs::read(store.path())?, before);
    Ok(())
}

#[tokio::test]
async fn test_profile_aware_retrieval() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    harness.pipeline().process_story(MOBY_DICK, "initial import")?;

    let extractor = harness.extractor(Arc::new(MockLlmClient::always(CHAPTER_TWO)));
    harness.profiles().update_from_text(&extractor, MOBY_DICK).await?;

    let retriever = harness.retriever();
    let results = retriever.get_character_context("old thunder", 1)?;
    assert!(results[0].text.contains("Ahab"), "got: {}", results[0].text);

    let unknown = retriever.get_character_context("Pip", 2)?;
    assert_eq!(unknown.len(), 2);

    let relationship = retriever.get_relationship_context("Ahab", "Starbuck", 3)?;
    assert_eq!(relationship.len(), 3);
    assert_eq!(relationship.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3]);

    let plot = retriever.get_plot_context("Moby Dick rammed the ship and the Pequod sank", 1)?;
    assert!(plot[0].text.contains("sank"), "got: {}", plot[0].text);
    Ok(())
}

#[tokio::test]
async fn test_story_elements_file() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let llm = Arc::new(
        MockLlmClient::new()
            .with_reply(
                r#"{"style": {"tone": "ominous", "pacing": "slow", "narrative_style": "first person"},
                    "characters": {"Ahab": {"role": "Captain"}},
                    "themes": ["obsession"]}"#,
            )
            .with_reply(r#"{"characters": {"Ahab": {"arc": "doom"}}, "themes": ["fate"]}"#),
    );
    let analyzer = harness.analyzer(llm);

    analyzer.update_story_elements("chapter one").await?;
    let elements = analyzer.update_story_elements("chapter two").await?;

    let on_disk: serde_json::Value = serde_json::from_slice(&std::fs::read(analyzer.path())?)?;
    assert_eq!(on_disk["themes"], serde_json::json!(["fate", "obsession"]));
    assert_eq!(on_disk["characters"]["Ahab"]["role"], "Captain");
    assert_eq!(on_disk["characters"]["Ahab"]["arc"], "doom");
    assert_eq!(on_disk["style"]["tone"], "ominous");
    assert_eq!(analyzer.load_story_elements()?, elements);
    Ok(())
}
