//! # loanqa-retriever
//!
//! Retrieval core for the loan-product QA pipeline: semantic search over a
//! chunked document corpus, plus the build step that produces the searchable
//! artifacts.
//!
//! ## Architecture
//!
//! ```text
//! Build:  cleaned corpus ──▶ TextChunker ──▶ EmbeddingProvider ──▶ VectorIndex
//!                                        └──────────────────────▶ ChunkStore
//! Query:  question ──▶ EmbeddingProvider ──▶ VectorIndex.search ──▶ ChunkStore
//!                                                └──▶ AnswerComposer ──▶ answer
//! ```
//!
//! The two persisted artifacts (flat vector index + ordered chunk store)
//! share one id space and are always written and loaded as a matched pair.
//! Chunking lives in `loanqa-context`, embedding backends in `loanqa-embed`;
//! this crate owns storage, retrieval, and composition.
//!
//! ## Quick Start
//!
//! ```no_run
//! use loanqa_retriever::config::{RagConfig, create_embedder};
//! use loanqa_retriever::retrieval::{AnswerComposer, QueryPipeline, Retriever};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RagConfig::default();
//! let embedder = create_embedder(&config.embedding).await?;
//! let retriever = Retriever::load(embedder, &config.index_path, &config.chunk_store_path)?;
//! let pipeline = QueryPipeline::new(retriever, AnswerComposer::local(), config.top_k);
//!
//! let answer = pipeline.answer("What is the home loan rate?").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use config::RagConfig;
pub use error::{Result, RetrievalError};
pub use retrieval::{AnswerComposer, IndexBuilder, QueryPipeline, Retriever};
pub use storage::{ChunkStore, VectorIndex};
