//! Sentence-aware text splitter.
//!
//! Cuts a story into overlapping passages of roughly `chunk_size` characters,
//! preferring to end a passage just after a sentence terminator and to start
//! the next one on a sentence boundary inside the overlap.
//!
//! All positions are character offsets, never byte offsets.

use std::path::Path;

use story_storage::{read_json, write_json_atomic};
use story_types::{Passage, StoryConfig};
use tracing::debug;

use crate::error::IngestError;

/// How far back from the naive end to look for a terminator.
pub const LOOKBACK_WINDOW: usize = 100;

/// How far forward from the overlap start to look for a terminator.
pub const LOOKAHEAD_WINDOW: usize = 100;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Splits text into [`Passage`]s without embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &StoryConfig) -> Result<Self, IngestError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` left to right. Passages cover every character; consecutive
    /// passages overlap by at most `chunk_overlap` characters.
    pub fn split(&self, text: &str) -> Vec<Passage> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut passages = Vec::new();
        let mut start = 0;

        while start < len {
            let end = self.chunk_end(&chars, start);
            passages.push(Passage::new(
                chars[start..end].iter().collect::<String>(),
                start,
                end,
            ));

            if end >= len {
                break;
            }
            start = self.next_start(&chars, start, end);
        }

        debug!(
            chars = len,
            passages = passages.len(),
            chunk_size = self.chunk_size,
            overlap = self.chunk_overlap,
            "Split text"
        );
        passages
    }

    /// End of the passage starting at `start`: the naive end, pulled back to
    /// just after the nearest terminator in the lookback window.
    fn chunk_end(&self, chars: &[char], start: usize) -> usize {
        let len = chars.len();
        let naive_end = (start + self.chunk_size).min(len);
        if naive_end >= len {
            return len;
        }

        let floor = naive_end.saturating_sub(LOOKBACK_WINDOW).max(start + 1);
        (floor..naive_end)
            .rev()
            .find(|&i| is_terminator(chars[i]))
            .map(|i| i + 1)
            .unwrap_or(naive_end)
    }

    /// Start of the passage after `[start, end)`.
    fn next_start(&self, chars: &[char], start: usize, end: usize) -> usize {
        let overlap_start = end.saturating_sub(self.chunk_overlap);
        let ceiling = (overlap_start + LOOKAHEAD_WINDOW).min(chars.len());

        let snapped = (overlap_start..ceiling)
            .find(|&i| is_terminator(chars[i]))
            .map(|i| i + 1)
            .unwrap_or(overlap_start);

        // Never leave a gap after `end`, never stall.
        let next = snapped.min(end);
        if next <= start {
            end
        } else {
            next
        }
    }
}

/// Write passages to `path` as pretty JSON.
pub fn save_passages(path: &Path, passages: &[Passage]) -> Result<(), IngestError> {
    write_json_atomic(path, passages)?;
    debug!(path = ?path, passages = passages.len(), "Saved passages");
    Ok(())
}

pub fn load_passages(path: &Path) -> Result<Vec<Passage>, IngestError> {
    Ok(read_json(path)?)
}
