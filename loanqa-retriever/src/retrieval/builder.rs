//! Build-time pipeline: cleaned documents → chunks → embeddings → a
//! persisted index/store pair.
//!
//! The builder owns the accumulation buffers outright, so the
//! vector-to-chunk-id mapping is in document order by construction.
//! Embedding runs as sequential batches (which also matches external rate
//! limits); any embedding failure aborts the whole build, and nothing is
//! persisted unless the build completed. A partial index on disk would
//! silently violate the shared id space.

use crate::error::{Result, RetrievalError};
use crate::storage::{ChunkStore, VectorIndex};
use anyhow::Context;
use loanqa_context::{Chunk, TextChunker};
use loanqa_embed::{EmbedError, EmbeddingProvider};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// A cleaned document as produced by the scraper + cleaner stage.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// URL the text was scraped from, when known.
    #[serde(default, alias = "url")]
    pub source_url: Option<String>,
    /// Cleaned, normalized text.
    #[serde(alias = "content")]
    pub text: String,
}

/// Reads a cleaned corpus file: a JSON array of `{url, content}` records.
pub fn load_corpus(path: &Path) -> anyhow::Result<Vec<Document>> {
    let bytes = fs::read(path)
        .with_context(|| format!("cannot read corpus file {}", path.display()))?;
    let documents: Vec<Document> = serde_json::from_slice(&bytes)
        .with_context(|| format!("cannot parse corpus file {}", path.display()))?;
    tracing::info!("Loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Turns a document corpus into a matched vector-index/chunk-store pair.
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
}

impl IndexBuilder {
    /// Builder chunking at `chunk_size` characters and embedding with
    /// `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunk_size: usize) -> Self {
        Self {
            embedder,
            chunker: TextChunker::new(chunk_size),
        }
    }

    /// Chunks and embeds `documents`, returning the in-memory pair.
    ///
    /// Empty or whitespace-only chunks are skipped, since they carry no signal
    /// and the embedder rejects them anyway. Chunk ids are assigned in
    /// document order; the returned index and store always have equal
    /// length.
    pub async fn build(&self, documents: &[Document]) -> Result<(VectorIndex, ChunkStore)> {
        let mut store = ChunkStore::new();
        let mut texts: Vec<String> = Vec::new();

        for document in documents {
            for piece in self.chunker.chunk(&document.text) {
                if piece.trim().is_empty() {
                    tracing::debug!("Skipping whitespace-only chunk");
                    continue;
                }
                let mut chunk = Chunk::new(store.len(), piece.clone());
                if let Some(url) = &document.source_url {
                    chunk = chunk.with_source_url(url.clone());
                }
                store.append(chunk);
                texts.push(piece);
            }
        }

        let mut index = VectorIndex::new();
        if texts.is_empty() {
            tracing::warn!("Corpus produced no non-empty chunks");
            return Ok((index, store));
        }

        tracing::info!(
            "Embedding {} chunks with backend '{}'",
            texts.len(),
            self.embedder.provider_name()
        );
        let result = self.embedder.embed_texts(&texts).await?;
        if result.len() != texts.len() {
            return Err(RetrievalError::Embed {
                source: EmbedError::invalid_config(format!(
                    "backend returned {} embeddings for {} chunks",
                    result.len(),
                    texts.len()
                )),
            });
        }

        index.add(&result.embeddings)?;
        Ok((index, store))
    }

    /// Writes a completed build as the matched artifact pair.
    pub fn persist(
        index: &VectorIndex,
        store: &ChunkStore,
        index_path: &Path,
        store_path: &Path,
    ) -> Result<()> {
        index.save(index_path)?;
        store.save(store_path)?;
        tracing::info!(
            "Persisted {} vectors to {} and {} chunks to {}",
            index.len(),
            index_path.display(),
            store.len(),
            store_path.display()
        );
        Ok(())
    }
}
