//! # story-types
//!
//! Shared domain types for the story index.
//!
//! This crate defines the data structures every other crate agrees on:
//! - Passages: contiguous slices of the source text with character offsets
//! - Passage metadata: the embedding-free view stored next to a vector index
//! - Configuration: the explicitly injected [`StoryConfig`] and its layered loader
//!
//! ## Usage
//!
//! ```rust
//! use story_types::{Passage, StoryConfig};
//!
//! let config = StoryConfig::default();
//! let passage = Passage::new("Call me Ishmael.", 0, 16);
//! assert!(passage.embedding.is_none());
//! assert_eq!(config.chunk_size, 500);
//! ```

pub mod config;
pub mod error;
pub mod passage;

pub use config::{Settings, StoryConfig, DEFAULT_EMBEDDING_DIM};
pub use error::StoryError;
pub use passage::{Passage, PassageMeta};
