//! Configuration for embedding backends

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default embedding model for the local backend.
///
/// The same lightweight sentence-transformer family the rest of the pipeline
/// was tuned against; 384-dimensional output.
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

/// Which embedding backend a component should construct.
///
/// Exactly one local and one remote implementation exist; everything else in
/// the pipeline is written against the
/// [`EmbeddingProvider`](crate::provider::EmbeddingProvider) trait and does
/// not care which one it received.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// In-process ONNX model via fastembed.
    Local(LocalEmbedConfig),
    /// Remote HTTP embedding service (OpenRouter-style `/embeddings`).
    Remote(RemoteEmbedConfig),
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Local(LocalEmbedConfig::default())
    }
}

/// Configuration for the local fastembed backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEmbedConfig {
    /// Name of the built-in fastembed model to load.
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Whether to L2-normalize embeddings after generation.
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_model_name() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_normalize() -> bool {
    true
}

impl Default for LocalEmbedConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            normalize: default_normalize(),
        }
    }
}

impl LocalEmbedConfig {
    /// Configuration for a named built-in model.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }
}

/// Configuration for the remote HTTP embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEmbedConfig {
    /// Base URL of the embedding API, e.g. `https://openrouter.ai/api/v1`.
    pub api_base: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token for the API. Usually populated from the environment
    /// rather than written into a config file.
    #[serde(default)]
    pub api_key: String,
    /// Maximum request attempts before surfacing failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base interval for exponential backoff, in seconds. Each retry doubles
    /// the previous interval.
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: u64,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_secs() -> u64 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

impl RemoteEmbedConfig {
    /// Configuration for a remote backend with default retry behavior.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
            max_retries: default_max_retries(),
            retry_base_secs: default_retry_base_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Set the maximum attempt count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// The backoff base as a [`Duration`].
    pub fn retry_base(&self) -> Duration {
        Duration::from_secs(self.retry_base_secs)
    }

    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_defaults() {
        let config = LocalEmbedConfig::default();
        assert_eq!(config.model_name, "all-MiniLM-L6-v2");
        assert!(config.normalize);
    }

    #[test]
    fn test_remote_defaults() {
        let config = RemoteEmbedConfig::new(
            "https://openrouter.ai/api/v1",
            "openai/text-embedding-3-small",
            "sk-test",
        );
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_backend_toml_round_trip() {
        let toml_src = r#"
            backend = "remote"
            api_base = "https://openrouter.ai/api/v1"
            model = "openai/text-embedding-3-small"
            max_retries = 5
        "#;
        let backend: EmbeddingBackend = toml::from_str(toml_src).unwrap();
        match backend {
            EmbeddingBackend::Remote(remote) => {
                assert_eq!(remote.model, "openai/text-embedding-3-small");
                assert_eq!(remote.max_retries, 5);
                assert_eq!(remote.retry_base_secs, 1);
            }
            EmbeddingBackend::Local(_) => panic!("expected remote backend"),
        }
    }
}
