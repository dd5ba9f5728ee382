//! The retrieval pipeline: building the index from a corpus, answering
//! queries against it, and composing the final answer text.

pub mod builder;
pub mod composer;
pub mod retriever;

pub use builder::{Document, IndexBuilder, load_corpus};
pub use composer::{
    AnswerComposer, CompletionConfig, CompletionService, OpenRouterCompletion,
};
pub use retriever::{QueryPipeline, Retriever};
