//! # story-vector
//!
//! Exact nearest-neighbour search over story passages.
//!
//! ## Features
//! - [`FlatIndex`]: brute-force squared-L2 index with a compact binary file format
//! - [`MetadataStore`]: passage text and offsets aligned with index ordinals
//! - [`IndexStore`]: the two together, built once per story version
//!
//! Search results are deterministic: nearest first, ties broken by the
//! smaller ordinal.

pub mod error;
pub mod flat;
pub mod index;
pub mod metadata;
pub mod store;

pub use error::VectorError;
pub use flat::{FlatIndex, FLAT_MAGIC, FLAT_VERSION};
pub use index::{IndexStats, SearchResult, VectorIndex};
pub use metadata::MetadataStore;
pub use store::{IndexStore, PassageHit};
