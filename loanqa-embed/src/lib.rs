//! # loanqa-embed
//!
//! Text embedding backends for the loanqa retrieval pipeline, behind a single
//! async [`EmbeddingProvider`] trait. Two implementations exist:
//!
//! - **Local ONNX models** via fastembed ([`FastEmbedProvider`]): the default
//!   `all-MiniLM-L6-v2` model runs in-process with no network dependency.
//! - **Remote HTTP service** ([`RemoteEmbedProvider`]): an OpenRouter-style
//!   `/embeddings` endpoint, with exponential-backoff retries.
//!
//! Everything downstream (index building, query embedding) is written against
//! the trait, so backends can be swapped through configuration alone.
//!
//! ## Quick Start
//!
//! ```no_run
//! use loanqa_embed::{EmbeddingProvider, FastEmbedProvider, LocalEmbedConfig};
//!
//! # async fn example() -> loanqa_embed::Result<()> {
//! let provider = FastEmbedProvider::create(LocalEmbedConfig::default()).await?;
//!
//! let texts = vec!["Home loans offer rates from 8%.".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`] using the crate's [`EmbedError`] type.
//! Two variants matter to callers: `Unavailable` (the remote backend failed
//! after retries, fatal to the current query but not the process) and
//! `EmptyInput` (skip the text, don't retry).

pub mod config;
pub mod error;
pub mod provider;
pub mod remote;

// Re-export main types for easy access
pub use config::{
    DEFAULT_LOCAL_MODEL, EmbeddingBackend, LocalEmbedConfig, RemoteEmbedConfig,
};
pub use error::{EmbedError, Result};
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
pub use remote::RemoteEmbedProvider;
