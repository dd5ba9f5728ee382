//! Flat vector index with exact nearest-neighbor search.
//!
//! The index is an append-only, ordered sequence of f32 vectors; a vector's
//! position is the id of the chunk it embeds. Search is an exact brute-force
//! scan computing squared Euclidean (L2) distance against every stored
//! vector; the corpus is tens to low-hundreds of chunks, so correctness and
//! simplicity beat sub-linear structures here.
//!
//! ## Persistence format
//!
//! A single little-endian binary file:
//!
//! ```text
//! magic "LQIX" (4 bytes) | version u8 | dimension u32 | count u32 | count*dimension f32
//! ```
//!
//! Float values round-trip exactly; insertion order is preserved. Anything
//! that does not parse back to a consistent index (wrong magic, truncated
//! payload, bad header) fails with
//! [`RetrievalError::IndexLoad`](crate::error::RetrievalError).

use crate::error::{Result, RetrievalError};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

const MAGIC: [u8; 4] = *b"LQIX";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 13;

/// Append-only store of fixed-dimension f32 vectors, searchable by squared
/// L2 distance.
///
/// The dimension is established by the first vector added and is invariant
/// for the lifetime of the index; vectors of any other length are rejected
/// with `DimensionMismatch`. There are no delete or update operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    count: usize,
    // Row-major, count * dimension values.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Creates an empty index. The dimension is fixed by the first `add`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no vectors have been added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The established embedding dimension, if any vector has been added.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Appends all `vectors` in order.
    ///
    /// The whole call fails with `DimensionMismatch` (leaving the index
    /// unchanged) if any vector's length differs from the established
    /// dimension (or, for a fresh index, from the first vector's length).
    /// On success the vectors are searchable immediately.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dimension = self.dimension.unwrap_or(first.len());

        // Validate everything up front so a failed call has no effect.
        for vector in vectors {
            if vector.len() != dimension || dimension == 0 {
                return Err(RetrievalError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        self.data.reserve(vectors.len() * dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        self.dimension = Some(dimension);
        self.count += vectors.len();
        Ok(())
    }

    /// Returns the `k` nearest stored vectors to `query` as
    /// `(chunk_id, squared_l2_distance)` pairs, ascending by distance with
    /// ties broken by ascending id.
    ///
    /// An empty index yields an empty result, not an error; `k` larger than
    /// the index yields every entry. A query whose length differs from the
    /// index dimension fails with `DimensionMismatch`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results: Vec<(usize, f32)> = self
            .data
            .chunks_exact(dimension)
            .enumerate()
            .map(|(id, row)| (id, squared_l2(query, row)))
            .collect();

        results.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        results.truncate(k);
        Ok(results)
    }

    /// Writes the full vector set to `path`, creating parent directories as
    /// needed. Float values are preserved exactly.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&(self.dimension.unwrap_or(0) as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.count as u32).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        tracing::debug!("Saved {} vectors to {}", self.count, path.display());
        Ok(())
    }

    /// Restores an index previously written with [`Self::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            RetrievalError::index_load(format!("cannot read {}: {e}", path.display()))
        })?;

        if bytes.len() < HEADER_LEN {
            return Err(RetrievalError::index_load(format!(
                "{} is too short to be a vector file",
                path.display()
            )));
        }
        if bytes[..4] != MAGIC {
            return Err(RetrievalError::index_load(format!(
                "{} has an unrecognized header",
                path.display()
            )));
        }
        if bytes[4] != FORMAT_VERSION {
            return Err(RetrievalError::index_load(format!(
                "{} uses unsupported format version {}",
                path.display(),
                bytes[4]
            )));
        }

        let dimension = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        let count = u32::from_le_bytes(bytes[9..13].try_into().unwrap()) as usize;
        let payload = &bytes[HEADER_LEN..];

        // Header fields come straight from the file; the expected size must
        // be computed without overflow so a garbage header cannot pass.
        let expected_len = (count as u64)
            .checked_mul(dimension as u64)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                RetrievalError::index_load(format!(
                    "{} declares an implausible size ({} vectors of dimension {})",
                    path.display(),
                    count,
                    dimension
                ))
            })?;
        if payload.len() as u64 != expected_len {
            return Err(RetrievalError::index_load(format!(
                "{} payload is {} bytes, expected {} for {} vectors of dimension {}",
                path.display(),
                payload.len(),
                expected_len,
                count,
                dimension
            )));
        }
        if count > 0 && dimension == 0 {
            return Err(RetrievalError::index_load(format!(
                "{} declares {} vectors of dimension 0",
                path.display(),
                count
            )));
        }

        let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
        Ok(Self {
            dimension: (count > 0).then_some(dimension),
            count,
            data,
        })
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
