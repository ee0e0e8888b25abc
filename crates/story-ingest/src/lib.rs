//! # story-ingest
//!
//! Turns story text into searchable, versioned passages.
//!
//! - [`TextSplitter`]: sentence-aware splitting into overlapping passages
//!   with character offsets
//! - [`IngestPipeline`]: split, embed, build the flat index and commit it as
//!   a new snapshot in one step
//!
//! ## Usage
//!
//! ```rust
//! use story_ingest::TextSplitter;
//!
//! let splitter = TextSplitter::new(500, 50).unwrap();
//! let passages = splitter.split("It was a dark and stormy night.");
//! assert_eq!(passages.len(), 1);
//! ```

pub mod error;
pub mod pipeline;
pub mod splitter;

pub use error::IngestError;
pub use pipeline::{IngestPipeline, IngestStats};
pub use splitter::{load_passages, save_passages, TextSplitter, LOOKAHEAD_WINDOW, LOOKBACK_WINDOW};
