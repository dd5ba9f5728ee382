//! Ordered chunk-text storage paired with the vector index.
//!
//! The store is a plain ordered sequence of [`Chunk`]s whose positions are
//! the same ids the [`VectorIndex`](super::vector_index::VectorIndex) uses:
//! the chunk at position `n` is the text behind vector `n`. Both artifacts
//! are written at build time with identical ordering and loaded together at
//! startup; keeping that shared id space intact is the store's only real job.
//!
//! Persistence is a JSON array (serde), human-inspectable on purpose: the
//! corpus is small and being able to eyeball the indexed text has saved more
//! debugging time than a binary format would save disk.

use crate::error::{Result, RetrievalError};
use loanqa_context::Chunk;
use std::fs;
use std::path::Path;

/// Append-only, ordered store of chunk texts and their source metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

impl ChunkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks; also the id the next appended chunk should
    /// carry.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Appends a chunk. Ids are positional: the builder assigns
    /// `store.len()` as the id before appending, and `load` revalidates the
    /// correspondence.
    pub fn append(&mut self, chunk: Chunk) {
        debug_assert_eq!(chunk.id, self.chunks.len(), "chunk ids are positional");
        self.chunks.push(chunk);
    }

    /// Looks up a chunk by id, failing with `ChunkNotFound` when `id` is out
    /// of range.
    pub fn get(&self, id: usize) -> Result<&Chunk> {
        self.chunks
            .get(id)
            .ok_or(RetrievalError::ChunkNotFound { id })
    }

    /// Iterate over all chunks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    /// Writes the store as a JSON array to `path`, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.chunks)
            .map_err(|e| RetrievalError::index_load(format!("cannot serialize chunks: {e}")))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        tracing::debug!("Saved {} chunks to {}", self.chunks.len(), path.display());
        Ok(())
    }

    /// Restores a store previously written with [`Self::save`], revalidating
    /// that every chunk's id matches its position.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            RetrievalError::index_load(format!("cannot read {}: {e}", path.display()))
        })?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&bytes).map_err(|e| {
            RetrievalError::index_load(format!("cannot parse {}: {e}", path.display()))
        })?;

        for (position, chunk) in chunks.iter().enumerate() {
            if chunk.id != position {
                return Err(RetrievalError::index_load(format!(
                    "{}: chunk at position {position} carries id {}",
                    path.display(),
                    chunk.id
                )));
            }
        }

        Ok(Self { chunks })
    }
}
