//! End-to-end test infrastructure for the story index.
//!
//! Provides a shared TestHarness wiring ingestion, versioning, profiles and
//! retrieval against one temporary story directory.

use std::path::PathBuf;
use std::sync::{Arc, Once};

use story_embeddings::{BatchEmbedder, HashEmbedder};
use story_ingest::IngestPipeline;
use story_profiles::{LlmClient, ProfileExtractor, ProfileStore, StoryAnalyzer};
use story_retrieval::Retriever;
use story_storage::VersionManager;
use story_types::StoryConfig;

/// Embedding dimension used by every harness.
pub const TEST_DIM: usize = 64;

/// A short story with distinct, well-separated sentences.
pub const MOBY_DICK: &str = "Call me Ishmael. Some years ago I went to sea aboard the Pequod. \
    Captain Ahab paced the quarterdeck and swore vengeance on the white whale that took his leg. \
    Starbuck, the first mate, warned that revenge on a dumb brute was blasphemous madness. \
    Queequeg, the harpooneer from a distant island, carved his own coffin while the crew slept. \
    On day three of the chase Moby Dick rammed the ship, and the Pequod sank.";

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Story directory inside the temp dir
    pub story_path: PathBuf,
    pub config: StoryConfig,
}

impl TestHarness {
    /// Harness with small chunks so short stories yield several passages.
    pub fn new() -> Self {
        Self::with_config(
            StoryConfig::default()
                .with_chunking(120, 20)
                .with_embedding_dimension(TEST_DIM),
        )
    }

    pub fn with_config(config: StoryConfig) -> Self {
        init_tracing();
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let story_path = temp_dir.path().join("story");

        Self {
            _temp_dir: temp_dir,
            story_path,
            config,
        }
    }

    pub fn embedder(&self) -> BatchEmbedder {
        BatchEmbedder::from_config(Arc::new(HashEmbedder::new(TEST_DIM)), &self.config)
            .expect("Failed to create embedder")
    }

    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(&self.story_path, &self.config, self.embedder())
            .expect("Failed to create pipeline")
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(&self.story_path, self.embedder()).expect("Failed to create retriever")
    }

    pub fn versions(&self) -> VersionManager {
        VersionManager::new(&self.story_path).expect("Failed to open version registry")
    }

    pub fn profiles(&self) -> ProfileStore {
        ProfileStore::new(&self.story_path)
    }

    pub fn extractor(&self, llm: Arc<dyn LlmClient>) -> ProfileExtractor {
        ProfileExtractor::new(llm)
    }

    pub fn analyzer(&self, llm: Arc<dyn LlmClient>) -> StoryAnalyzer {
        StoryAnalyzer::new(&self.story_path, llm)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Install a test subscriber once. Honors `RUST_LOG`, defaults to warnings.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
