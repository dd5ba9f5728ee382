//! Storage layer for the retrieval core: the flat vector index and the
//! parallel chunk-text store.
//!
//! The two artifacts share one id space (position `n` in the
//! [`VectorIndex`](vector_index::VectorIndex) is the embedding of chunk `n`
//! in the [`ChunkStore`](chunk_store::ChunkStore)) and are persisted as a
//! matched pair. Loading them with mismatched lengths is a fatal
//! `IndexLoadError`; that check lives in
//! [`Retriever::load`](crate::retrieval::retriever::Retriever::load), which
//! is the only place the pair comes back together.

pub mod chunk_store;
pub mod vector_index;

pub use chunk_store::ChunkStore;
pub use vector_index::VectorIndex;
