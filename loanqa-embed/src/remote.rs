//! Remote HTTP embedding backend.
//!
//! Talks to an OpenRouter-style embeddings endpoint: POST
//! `{api_base}/embeddings` with a bearer token and `{model, input}` payload.
//! Transient failures (network errors, non-2xx responses, malformed bodies)
//! are retried with exponential backoff before surfacing as
//! [`EmbedError::Unavailable`].

use crate::config::RemoteEmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, check_input};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Maximum number of texts sent in a single request.
const REQUEST_BATCH_SIZE: usize = 16;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote HTTP service.
#[derive(Debug)]
pub struct RemoteEmbedProvider {
    config: RemoteEmbedConfig,
    client: reqwest::Client,
    retry_base: Duration,
    // Learned from the first successful response; 0 until then.
    dimension: AtomicUsize,
}

impl RemoteEmbedProvider {
    /// Creates a provider for the configured remote backend.
    pub fn new(config: RemoteEmbedConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            return Err(EmbedError::invalid_config("api_base must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EmbedError::External { source: e.into() })?;

        Ok(Self {
            retry_base: config.retry_base(),
            config,
            client,
            dimension: AtomicUsize::new(0),
        })
    }

    /// Override the backoff base interval. Primarily useful in tests, where
    /// waiting whole seconds between attempts is pointless.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.api_base.trim_end_matches('/'))
    }

    /// One request attempt, no retries.
    async fn send_once(&self, inputs: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let payload = EmbedRequest {
            model: &self.config.model,
            input: inputs,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("embedding service returned status {status}"));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .context("malformed embedding response body")?;

        if body.data.len() != inputs.len() {
            return Err(anyhow!(
                "embedding service returned {} vectors for {} inputs",
                body.data.len(),
                inputs.len()
            ));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Request embeddings with exponential backoff.
    ///
    /// The interval doubles after each failed attempt, starting from the
    /// configured base.
    async fn send_with_retry(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let max_attempts = self.config.max_retries.max(1);
        let mut delay = self.retry_base;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.send_once(inputs).await {
                Ok(vectors) => {
                    if let Some(first) = vectors.first() {
                        self.dimension.store(first.len(), Ordering::Relaxed);
                    }
                    return Ok(vectors);
                }
                Err(e) => {
                    last_error = format!("{e:#}");
                    tracing::warn!(
                        "Embedding attempt {attempt}/{max_attempts} failed: {last_error}"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(EmbedError::unavailable(max_attempts, last_error))
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        check_input(text)?;
        let texts = vec![text.to_string()];
        let mut vectors = self.send_with_retry(&texts).await?;
        Ok(vectors.remove(0))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }
        for text in texts {
            check_input(text)?;
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(REQUEST_BATCH_SIZE) {
            let vectors = self.send_with_retry(batch).await?;
            all_embeddings.extend(vectors);
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn provider_name(&self) -> &str {
        "remote"
    }
}
