//! Exact flat index over squared Euclidean distance.
//!
//! Vectors are stored row-major in one contiguous buffer; search scans every
//! row. The on-disk form is a fixed little-endian layout:
//!
//! ```text
//! magic   b"SFLT"
//! version u16
//! dim     u32
//! count   u64
//! data    count * dim * f32
//! ```

use std::cmp::Ordering;
use std::path::Path;

use story_storage::atomic_write;
use tracing::{debug, info};

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

pub const FLAT_MAGIC: [u8; 4] = *b"SFLT";
pub const FLAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 4 + 8;

/// Brute-force index returning exact nearest neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Stored vector at `ordinal`.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        if ordinal >= self.len() {
            return None;
        }
        let start = ordinal * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    fn check_dimension(&self, actual: usize) -> Result<(), VectorError> {
        if actual != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Encode the index into its binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, VectorError> {
        let dim = u32::try_from(self.dimension)
            .map_err(|_| VectorError::InvalidFormat("dimension exceeds u32".to_string()))?;
        let count = self.len() as u64;

        let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        buf.extend_from_slice(&FLAT_MAGIC);
        buf.extend_from_slice(&FLAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&dim.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        for value in &self.data {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        Ok(buf)
    }

    /// Decode an index from its binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VectorError> {
        if bytes.len() < HEADER_LEN {
            return Err(VectorError::InvalidFormat(format!(
                "file too short for header: {} bytes",
                bytes.len()
            )));
        }

        let (header, body) = bytes.split_at(HEADER_LEN);
        if header[0..4] != FLAT_MAGIC {
            return Err(VectorError::InvalidFormat(format!(
                "bad magic {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FLAT_VERSION {
            return Err(VectorError::InvalidFormat(format!(
                "unsupported version {}",
                version
            )));
        }

        let dimension = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&header[10..18]);
        let count = usize::try_from(u64::from_le_bytes(count_bytes))
            .map_err(|_| VectorError::InvalidFormat("count exceeds usize".to_string()))?;
        if dimension == 0 && count > 0 {
            return Err(VectorError::InvalidFormat(
                "zero dimension with non-zero count".to_string(),
            ));
        }

        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| VectorError::InvalidFormat("size overflow".to_string()))?;
        if body.len() != expected {
            return Err(VectorError::InvalidFormat(format!(
                "expected {} data bytes for {} x {}, found {}",
                expected,
                count,
                dimension,
                body.len()
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self { dimension, data })
    }

    /// Write the index atomically to `path`.
    pub fn save(&self, path: &Path) -> Result<(), VectorError> {
        atomic_write(path, &self.to_bytes()?)?;
        info!(path = ?path, vectors = self.len(), "Saved vector index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, VectorError> {
        let bytes = std::fs::read(path)?;
        let index = Self::from_bytes(&bytes)?;
        info!(path = ?path, vectors = index.len(), dim = index.dimension, "Loaded vector index");
        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest first; equal distances go to the smaller ordinal.
fn by_distance_then_ordinal(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.ordinal.cmp(&b.ordinal))
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data.len() / self.dimension
    }

    fn build(&mut self, vectors: &[Vec<f32>]) -> Result<(), VectorError> {
        if !self.is_empty() {
            return Err(VectorError::AlreadyBuilt(self.len()));
        }
        for vector in vectors {
            self.check_dimension(vector.len())?;
        }

        let mut data = Vec::with_capacity(vectors.len() * self.dimension);
        for vector in vectors {
            data.extend_from_slice(vector);
        }
        self.data = data;

        debug!(vectors = vectors.len(), dim = self.dimension, "Built flat index");
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_dimension(query.len())?;

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<SearchResult> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| SearchResult::new(ordinal, squared_l2(row, query)))
            .collect();

        if k < results.len() {
            results.select_nth_unstable_by(k - 1, by_distance_then_ordinal);
            results.truncate(k);
        }
        results.sort_by(by_distance_then_ordinal);

        debug!(k = k, found = results.len(), "Search complete");
        Ok(results)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
            size_bytes: (self.data.len() * std::mem::size_of::<f32>()) as u64,
        }
    }
}
