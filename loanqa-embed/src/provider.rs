//! Embedding provider trait and the local fastembed implementation

use crate::config::LocalEmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f32 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector; an empty
    /// result has dimension 0.
    pub fn new(embeddings: Vec<Vec<f32>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text.
///
/// Implementations must be deterministic for a fixed backend: the same text
/// always maps to the same vector, so that a query embedded at search time
/// lands in the same space as the corpus embedded at build time.
///
/// Empty or whitespace-only input is rejected with [`EmbedError::EmptyInput`];
/// callers are expected to skip such texts rather than retry.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, preserving input order
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider.
    ///
    /// May be 0 for remote providers before the first embedding has been
    /// generated; the vector index establishes its dimension from the first
    /// vector added, so this is informational.
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Reject empty or whitespace-only input per the embedding contract.
pub(crate) fn check_input(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        Err(EmbedError::EmptyInput)
    } else {
        Ok(())
    }
}

/// Type alias for cached model entries (model, dimension)
type ModelCacheEntry = (Arc<Mutex<TextEmbedding>>, usize);

/// Global cache for initialized embedding models to avoid reloading
static MODEL_CACHE: OnceLock<Mutex<HashMap<String, ModelCacheEntry>>> = OnceLock::new();

/// Get the global model cache
fn get_model_cache() -> &'static Mutex<HashMap<String, ModelCacheEntry>> {
    MODEL_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Map a configured model name onto a fastembed built-in.
fn builtin_model(model_name: &str) -> Result<EmbeddingModel> {
    match model_name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbedError::invalid_config(format!(
            "unknown embedding model '{other}'"
        ))),
    }
}

/// FastEmbed-based embedding provider running a real ONNX model in-process.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: LocalEmbedConfig,
    model: Option<Arc<Mutex<TextEmbedding>>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("model", &self.model.is_some())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Creates a new uninitialized provider. Call [`Self::initialize`] (or use
    /// [`Self::create`]) before embedding anything.
    pub fn new(config: LocalEmbedConfig) -> Self {
        Self {
            config,
            model: None,
            dimension: 0,
        }
    }

    /// Creates and initializes a provider in one step.
    pub async fn create(config: LocalEmbedConfig) -> Result<Self> {
        let mut provider = Self::new(config);
        provider.initialize().await?;
        Ok(provider)
    }

    /// Loads the embedding model, reusing a cached instance when one exists
    /// for the same model name.
    pub async fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing FastEmbed provider for model: {}",
            self.config.model_name
        );

        let cache_key = self.config.model_name.clone();

        let cached_data = {
            let cache = get_model_cache().lock().unwrap();
            cache
                .get(&cache_key)
                .map(|(model, dim)| (Arc::clone(model), *dim))
        };

        if let Some((cached_model, cached_dimension)) = cached_data {
            tracing::info!("Using cached model for: {}", self.config.model_name);
            self.model = Some(cached_model);
            self.dimension = cached_dimension;
            return Ok(());
        }

        let embedding_model = builtin_model(&self.config.model_name)?;
        let model_name = self.config.model_name.clone();

        // Load model in a blocking task
        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                tracing::info!("Loading embedding model: {model_name}");

                let init_options =
                    InitOptions::new(embedding_model).with_show_download_progress(false);

                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                // Probe the dimension with a test embedding
                let test_embeddings = model
                    .embed(vec!["test".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = test_embeddings.first().map(|emb| emb.len()).unwrap_or(384);

                tracing::info!("Model loaded successfully. Dimension: {dimension}");
                Ok((model, dimension))
            })
            .await??;

        let model_arc = Arc::new(Mutex::new(model));
        {
            let mut cache = get_model_cache().lock().unwrap();
            cache.insert(cache_key, (Arc::clone(&model_arc), dimension));
        }

        self.model = Some(model_arc);
        self.dimension = dimension;
        Ok(())
    }

    /// Clears the global model cache.
    pub fn clear_cache() {
        let cache = get_model_cache();
        let mut cache_guard = cache.lock().unwrap();
        cache_guard.clear();
        tracing::info!("Model cache cleared");
    }

    /// Returns the number of cached models.
    pub fn cache_size() -> usize {
        let cache = get_model_cache();
        let cache_guard = cache.lock().unwrap();
        cache_guard.len()
    }

    /// L2-normalize each embedding when the config asks for it.
    fn postprocess(&self, embeddings: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
        if !self.config.normalize {
            return embeddings;
        }
        embeddings
            .into_iter()
            .map(|mut embedding| {
                let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut embedding {
                        *value /= norm;
                    }
                }
                embedding
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        check_input(text)?;
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("no embedding generated for text"))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }
        for text in texts {
            check_input(text)?;
        }

        let model = self.model.as_ref().ok_or_else(|| {
            EmbedError::invalid_config("model not initialized; call initialize() first")
        })?;

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        // Process in batches to avoid memory issues
        let batch_size = 16;
        let mut all_embeddings = Vec::new();

        for chunk in texts.chunks(batch_size) {
            let chunk = chunk.to_vec();
            let model_clone = Arc::clone(model);

            let batch_embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                tracing::debug!("Processing batch of {} texts", chunk.len());

                let mut model_guard = model_clone.lock().unwrap();
                let embeddings = model_guard
                    .embed(chunk, None)
                    .map_err(|e| EmbedError::External { source: e })?;

                Ok(embeddings)
            })
            .await??;

            all_embeddings.extend(self.postprocess(batch_embeddings));
        }

        tracing::debug!("Generated {} embeddings", all_embeddings.len());
        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_result() {
        let embeddings = vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
        let result = EmbeddingResult::new(embeddings);

        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_fastembed_provider_creation() {
        let config = LocalEmbedConfig::default();
        let provider = FastEmbedProvider::new(config);

        assert_eq!(provider.provider_name(), "fastembed");
        assert_eq!(provider.embedding_dimension(), 0); // unknown until initialized
    }

    #[test]
    fn test_builtin_model_lookup() {
        assert!(builtin_model("all-MiniLM-L6-v2").is_ok());
        assert!(matches!(
            builtin_model("no-such-model"),
            Err(EmbedError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_uninitialized_provider_rejects_embedding() {
        let provider = FastEmbedProvider::new(LocalEmbedConfig::default());
        let result = provider.embed_text("home loan rates").await;
        assert!(matches!(result, Err(EmbedError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_model_access() {
        // EmptyInput takes precedence over the missing model: the contract is
        // checked at the trait boundary.
        let provider = FastEmbedProvider::new(LocalEmbedConfig::default());
        assert!(matches!(
            provider.embed_text("   \n\t").await,
            Err(EmbedError::EmptyInput)
        ));
    }

    #[tokio::test]
    #[ignore] // Integration test: downloads the real MiniLM model - run with: cargo test -- --ignored
    async fn test_minilm_embedding_generation() -> Result<()> {
        let provider = FastEmbedProvider::create(LocalEmbedConfig::default()).await?;

        assert_eq!(provider.embedding_dimension(), 384);

        let embedding = provider
            .embed_text("Home loans offer rates from 8%.")
            .await?;
        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().any(|&x| x != 0.0));
        assert!(embedding.iter().all(|&x| x.is_finite()));

        // Normalized by default
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);

        // Deterministic for a fixed backend
        let again = provider
            .embed_text("Home loans offer rates from 8%.")
            .await?;
        assert_eq!(embedding, again);

        Ok(())
    }
}
