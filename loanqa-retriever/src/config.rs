//! Pipeline configuration: one TOML file describing the embedding backend,
//! chunking and retrieval parameters, artifact paths, and the optional
//! completion service.
//!
//! Secrets never live in the file; [`RagConfig::resolve_api_keys_from_env`]
//! fills them in from `OPENROUTER_API_KEY` after parsing.

use crate::retrieval::CompletionConfig;
use anyhow::Context;
use loanqa_embed::{
    EmbeddingBackend, EmbeddingProvider, FastEmbedProvider, RemoteEmbedProvider,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable consulted for remote API keys.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Top-level configuration for the QA pipeline.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// fully local pipeline: fastembed embeddings, template-composed answers,
/// artifacts under `vectors/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Which embedding backend to construct.
    pub embedding: EmbeddingBackend,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// How many chunks to retrieve per query.
    pub top_k: usize,
    /// Where the vector index artifact lives.
    pub index_path: PathBuf,
    /// Where the chunk store artifact lives.
    pub chunk_store_path: PathBuf,
    /// Optional squared-L2 cutoff; hits farther than this are dropped.
    pub max_distance: Option<f32>,
    /// Completion service for generated answers; `None` composes locally.
    pub completion: Option<CompletionConfig>,
}

impl RagConfig {
    /// Parses a TOML configuration file.
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Fills empty API-key fields from the environment. Keys already present
    /// in the file win; a missing variable is left empty and surfaces later
    /// as an authentication failure from the service itself.
    pub fn resolve_api_keys_from_env(mut self) -> Self {
        let key = std::env::var(API_KEY_ENV).unwrap_or_default();
        if key.is_empty() {
            return self;
        }
        if let EmbeddingBackend::Remote(remote) = &mut self.embedding {
            if remote.api_key.is_empty() {
                remote.api_key = key.clone();
            }
        }
        if let Some(completion) = &mut self.completion {
            if completion.api_key.is_empty() {
                completion.api_key = key;
            }
        }
        self
    }

    /// Set the retrieval depth.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the chunk size in characters.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_top_k() -> usize {
    3
}

fn default_index_path() -> PathBuf {
    PathBuf::from("vectors/loan_vectors.idx")
}

fn default_chunk_store_path() -> PathBuf {
    PathBuf::from("vectors/chunk_texts.json")
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingBackend::default(),
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
            index_path: default_index_path(),
            chunk_store_path: default_chunk_store_path(),
            max_distance: None,
            completion: None,
        }
    }
}

/// Constructs the configured embedding backend.
pub async fn create_embedder(
    backend: &EmbeddingBackend,
) -> loanqa_embed::Result<Arc<dyn EmbeddingProvider>> {
    match backend {
        EmbeddingBackend::Local(local) => {
            let provider = FastEmbedProvider::create(local.clone()).await?;
            Ok(Arc::new(provider))
        }
        EmbeddingBackend::Remote(remote) => {
            let provider = RemoteEmbedProvider::new(remote.clone())?;
            Ok(Arc::new(provider))
        }
    }
}
