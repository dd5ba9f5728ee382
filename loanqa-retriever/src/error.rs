//! Error types for the retrieval core

use loanqa_embed::EmbedError;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error type for index building, persistence, and query-time retrieval.
///
/// The propagation policy follows the failure taxonomy of the pipeline:
///
/// - `DimensionMismatch` is a configuration or programmer error (the index
///   and the embedding model disagree) and is fatal.
/// - `IndexLoad` means the persisted artifacts are corrupt, missing, or
///   inconsistent with each other; fatal at startup.
/// - `ChunkNotFound` is an internal consistency check; the retriever logs and
///   drops such hits, they never reach the user.
/// - `Embed` wraps [`EmbedError`]; `EmbedError::Unavailable` is the one
///   query-time failure that surfaces to the caller instead of degrading.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// A vector's length disagrees with the index's established dimension
    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted index artifacts are corrupt, missing, or inconsistent
    #[error("failed to load persisted index: {message}")]
    IndexLoad { message: String },

    /// A search hit referenced a chunk id outside the store
    #[error("chunk id {id} not found in store")]
    ChunkNotFound { id: usize },

    /// Embedding backend failure
    #[error(transparent)]
    Embed {
        #[from]
        source: EmbedError,
    },

    /// IO errors while writing artifacts
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl RetrievalError {
    /// Create an [`RetrievalError::IndexLoad`] with a custom message.
    pub fn index_load(message: impl Into<String>) -> Self {
        Self::IndexLoad {
            message: message.into(),
        }
    }

    /// Whether this error is the embedding backend being unavailable, the
    /// one failure mode a single query is allowed to surface.
    pub fn is_embedding_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Embed {
                source: EmbedError::Unavailable { .. }
            }
        )
    }
}
