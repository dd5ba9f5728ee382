//! Query-time retrieval: map a question into the corpus vector space and
//! return the closest chunks.

use crate::error::{Result, RetrievalError};
use crate::retrieval::composer::AnswerComposer;
use crate::storage::{ChunkStore, VectorIndex};
use loanqa_context::Chunk;
use loanqa_embed::EmbeddingProvider;
use std::path::Path;
use std::sync::Arc;

/// Orchestrates the embedder, vector index, and chunk store to answer
/// "given a query, which chunks are most similar".
///
/// The index and store are read-only here; a fresh query vector is computed
/// per query and never persisted. Embedder failures propagate: the caller
/// must be able to tell "the backend is down" apart from "nothing matched",
/// which is simply an empty result from an empty index.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    store: ChunkStore,
    max_distance: Option<f32>,
}

impl Retriever {
    /// Assembles a retriever from already-loaded parts, enforcing the shared
    /// id-space invariant between index and store.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        store: ChunkStore,
    ) -> Result<Self> {
        if index.len() != store.len() {
            return Err(RetrievalError::index_load(format!(
                "vector index holds {} entries but chunk store holds {}",
                index.len(),
                store.len()
            )));
        }
        Ok(Self {
            embedder,
            index,
            store,
            max_distance: None,
        })
    }

    /// Loads the persisted index/store pair from disk.
    ///
    /// Mismatched lengths between the two files are a fatal `IndexLoadError`:
    /// the artifacts were not written by the same build.
    pub fn load(
        embedder: Arc<dyn EmbeddingProvider>,
        index_path: &Path,
        store_path: &Path,
    ) -> Result<Self> {
        let index = VectorIndex::load(index_path)?;
        let store = ChunkStore::load(store_path)?;
        tracing::info!(
            "Loaded {} vectors and {} chunks",
            index.len(),
            store.len()
        );
        Self::new(embedder, index, store)
    }

    /// Drop results whose squared L2 distance exceeds `max_distance`.
    /// `None` (the default) returns every hit regardless of confidence.
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the top-`k` chunks most similar to `query`, in similarity
    /// order.
    ///
    /// Embedding failure propagates (`EmbeddingUnavailable` when the remote
    /// backend has exhausted its retries); this method never masks a broken
    /// backend as an empty result. A search hit whose id fails store lookup
    /// is logged and dropped; the shared-order invariant means this should
    /// not occur.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let query_vector = self.embedder.embed_text(query).await?;
        let hits = self.index.search(&query_vector, k)?;

        let mut chunks = Vec::with_capacity(hits.len());
        for (id, distance) in hits {
            if let Some(max) = self.max_distance {
                if distance > max {
                    tracing::debug!(
                        "Dropping chunk {id} at distance {distance} (threshold {max})"
                    );
                    continue;
                }
            }
            match self.store.get(id) {
                Ok(chunk) => chunks.push(chunk.clone()),
                Err(e) => tracing::warn!("Dropping search hit: {e}"),
            }
        }
        Ok(chunks)
    }
}

/// The end-to-end query path: embed, search, compose.
///
/// Only the embedding stage may fail a query; search or composition problems
/// degrade to a best-effort textual answer so one bad query can never take
/// the process down.
pub struct QueryPipeline {
    retriever: Retriever,
    composer: AnswerComposer,
    top_k: usize,
}

impl QueryPipeline {
    /// Assembles the pipeline.
    pub fn new(retriever: Retriever, composer: AnswerComposer, top_k: usize) -> Self {
        Self {
            retriever,
            composer,
            top_k,
        }
    }

    /// Answers a free-text question.
    ///
    /// The only error this surfaces is the embedding backend being
    /// unavailable; every other failure (including blank input, which is
    /// trimmed away before embedding) falls back to a fixed textual answer.
    pub async fn answer(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(self.composer.compose(query, &[]).await);
        }

        let chunks = match self.retriever.retrieve(query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(e) if e.is_embedding_unavailable() => return Err(e),
            Err(e) => {
                tracing::warn!("Search stage failed, degrading to empty context: {e}");
                Vec::new()
            }
        };
        Ok(self.composer.compose(query, &chunks).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loanqa_embed::{EmbedError, EmbeddingResult};

    /// Maps a few fixed phrases to fixed vectors; anything else lands at the
    /// origin.
    struct PhraseEmbedder;

    fn phrase_vector(text: &str) -> Vec<f32> {
        match text {
            "home loans" => vec![1.0, 0.0],
            "car loans" => vec![0.0, 1.0],
            _ => vec![0.0, 0.0],
        }
    }

    #[async_trait]
    impl EmbeddingProvider for PhraseEmbedder {
        async fn embed_text(&self, text: &str) -> loanqa_embed::Result<Vec<f32>> {
            Ok(phrase_vector(text))
        }

        async fn embed_texts(&self, texts: &[String]) -> loanqa_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(
                texts.iter().map(|t| phrase_vector(t)).collect(),
            ))
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "phrase-stub"
        }
    }

    /// Always fails like a remote backend with exhausted retries.
    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        async fn embed_text(&self, _text: &str) -> loanqa_embed::Result<Vec<f32>> {
            Err(EmbedError::unavailable(3, "connection refused"))
        }

        async fn embed_texts(&self, _texts: &[String]) -> loanqa_embed::Result<EmbeddingResult> {
            Err(EmbedError::unavailable(3, "connection refused"))
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "down-stub"
        }
    }

    fn sample_parts() -> (VectorIndex, ChunkStore) {
        let mut index = VectorIndex::new();
        index.add(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();

        let mut store = ChunkStore::new();
        store.append(Chunk::new(0, "Home loans offer rates from 8%."));
        store.append(Chunk::new(1, "Car loans require a down payment."));
        (index, store)
    }

    #[tokio::test]
    async fn test_retrieve_returns_chunks_in_similarity_order() {
        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(PhraseEmbedder), index, store).unwrap();

        let chunks = retriever.retrieve("home loans", 2).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, 0);
        assert_eq!(chunks[1].id, 1);
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_corpus_is_ok_and_empty() {
        let retriever = Retriever::new(
            Arc::new(PhraseEmbedder),
            VectorIndex::new(),
            ChunkStore::new(),
        )
        .unwrap();

        let chunks = retriever.retrieve("home loans", 3).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_embedder_failure_propagates() {
        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(DownEmbedder), index, store).unwrap();

        let result = retriever.retrieve("home loans", 1).await;
        assert!(result.as_ref().err().is_some_and(|e| e.is_embedding_unavailable()));
    }

    #[tokio::test]
    async fn test_max_distance_filters_low_confidence_hits() {
        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(PhraseEmbedder), index, store)
            .unwrap()
            .with_max_distance(Some(0.5));

        // "home loans" is at distance 0 from chunk 0 and 2.0 from chunk 1.
        let chunks = retriever.retrieve("home loans", 2).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let mut index = VectorIndex::new();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        let store = ChunkStore::new();

        assert!(matches!(
            Retriever::new(Arc::new(PhraseEmbedder), index, store),
            Err(RetrievalError::IndexLoad { .. })
        ));
    }

    #[tokio::test]
    async fn test_pipeline_blank_query_never_reaches_embedder() {
        use crate::retrieval::composer::NO_CONTEXT_ANSWER;

        // DownEmbedder fails every call, so a non-error answer proves the
        // blank query was dropped before embedding.
        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(DownEmbedder), index, store).unwrap();
        let pipeline = QueryPipeline::new(retriever, AnswerComposer::local(), 2);

        let answer = pipeline.answer("   \n\t").await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }

    /// Rejects every input the way providers reject empty text.
    struct EmptyInputEmbedder;

    #[async_trait]
    impl EmbeddingProvider for EmptyInputEmbedder {
        async fn embed_text(&self, _text: &str) -> loanqa_embed::Result<Vec<f32>> {
            Err(EmbedError::EmptyInput)
        }

        async fn embed_texts(&self, _texts: &[String]) -> loanqa_embed::Result<EmbeddingResult> {
            Err(EmbedError::EmptyInput)
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "empty-input-stub"
        }
    }

    #[tokio::test]
    async fn test_pipeline_degrades_on_empty_input_rejection() {
        use crate::retrieval::composer::NO_CONTEXT_ANSWER;

        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(EmptyInputEmbedder), index, store).unwrap();
        let pipeline = QueryPipeline::new(retriever, AnswerComposer::local(), 2);

        // EmptyInput is not a backend outage; the query degrades instead of
        // erroring.
        let answer = pipeline.answer("...").await.unwrap();
        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }

    #[tokio::test]
    async fn test_pipeline_propagates_embedding_unavailable_only() {
        let (index, store) = sample_parts();
        let retriever = Retriever::new(Arc::new(DownEmbedder), index, store).unwrap();
        let pipeline = QueryPipeline::new(retriever, AnswerComposer::local(), 2);

        let result = pipeline.answer("What is the home loan rate?").await;
        assert!(result.as_ref().err().is_some_and(|e| e.is_embedding_unavailable()));
    }
}
