//! # story-retrieval
//!
//! Answers questions about a story from its current index snapshot.
//!
//! Queries are embedded with the same model used at ingestion and matched
//! against the current version's flat index. Character and relationship
//! lookups consult the story's profiles to build richer queries.

pub mod error;
pub mod query;
pub mod retriever;

pub use error::RetrievalError;
pub use query::{character_query, plot_query, relationship_hints, relationship_query, RelationshipHint};
pub use retriever::{RetrievedPassage, Retriever};
