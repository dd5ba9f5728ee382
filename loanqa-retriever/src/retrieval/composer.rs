//! Answer composition: turn retrieved chunks into a context block and, when
//! a completion service is configured, into a generated answer.
//!
//! Composition is the best-effort end of the pipeline. A completion failure
//! (timeout, non-2xx status, malformed body) is caught here and mapped to a
//! fixed fallback string; it never propagates to the caller, so query
//! answering degrades gracefully rather than crashing.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use loanqa_context::Chunk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Returned when the completion service fails.
pub const FALLBACK_ANSWER: &str = "Sorry, I couldn't generate an answer at the moment.";

/// Returned when retrieval produced no context at all.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information to answer your question.";

/// An external natural-language completion backend.
///
/// The core only needs this one operation; the single production
/// implementation is [`OpenRouterCompletion`], and tests substitute stubs.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Produce an answer to `query` grounded in `context`.
    async fn complete(&self, query: &str, context: &str) -> anyhow::Result<String>;
}

/// Assembles retrieved chunks into an answer.
///
/// Two modes: *local* returns a fixed template embedding the context
/// verbatim (no completion backend configured); *delegated* forwards
/// `(query, context)` to a [`CompletionService`] and returns its response
/// verbatim, falling back to [`FALLBACK_ANSWER`] on any service failure.
pub struct AnswerComposer {
    completion: Option<Arc<dyn CompletionService>>,
}

impl AnswerComposer {
    /// Composer without a completion backend; answers are the fixed local
    /// template.
    pub fn local() -> Self {
        Self { completion: None }
    }

    /// Composer delegating to a completion service.
    pub fn with_completion(service: Arc<dyn CompletionService>) -> Self {
        Self {
            completion: Some(service),
        }
    }

    /// Builds the context block: each chunk's text labeled by 1-based
    /// position, blank-line separated.
    pub fn build_context(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("[Source {}]: {}", i + 1, chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Produces the final answer text for `query` from the retrieved
    /// `chunks`. Never fails; see the module docs for the degradation rules.
    pub async fn compose(&self, query: &str, chunks: &[Chunk]) -> String {
        if chunks.is_empty() {
            return NO_CONTEXT_ANSWER.to_string();
        }
        let context = Self::build_context(chunks);

        match &self.completion {
            None => format!(
                "Based on the following context, the answer to your question is:\n\n\
                 {context}\n\n\
                 (Note: this answer was composed locally; configure a completion \
                 service for a generated one.)"
            ),
            Some(service) => match service.complete(query, &context).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!("Completion service failed: {e:#}");
                    FALLBACK_ANSWER.to_string()
                }
            },
        }
    }
}

/// Configuration for the OpenRouter-style chat-completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of the completion API, e.g. `https://openrouter.ai/api/v1`.
    pub api_base: String,
    /// Chat model identifier.
    pub model: String,
    /// Bearer token; usually populated from the environment.
    #[serde(default)]
    pub api_key: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Response token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}

impl CompletionConfig {
    /// Configuration with default sampling parameters.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant for loan products. Answer questions based only on the provided context.";

/// Completion service backed by an OpenRouter-style `/chat/completions`
/// endpoint.
pub struct OpenRouterCompletion {
    config: CompletionConfig,
    client: reqwest::Client,
}

impl OpenRouterCompletion {
    /// Creates a client for the configured endpoint.
    pub fn new(config: CompletionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionService for OpenRouterCompletion {
    async fn complete(&self, query: &str, context: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Context:\n{context}\n\nQuestion: {query}\n\n\
                         Give a short and precise answer. Mention which source(s) were used \
                         (e.g., [Source 1]). Say 'I don't know' if the answer is not in the context."
                    ),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .context("completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("completion service returned status {status}"));
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("malformed completion response body")?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("completion response contained no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "Home loans offer rates from 8%."),
            Chunk::new(1, "Car loans require a down payment."),
        ]
    }

    #[test]
    fn test_context_block_labels_sources_one_based() {
        let context = AnswerComposer::build_context(&sample_chunks());
        assert_eq!(
            context,
            "[Source 1]: Home loans offer rates from 8%.\n\n\
             [Source 2]: Car loans require a down payment."
        );
    }

    #[tokio::test]
    async fn test_local_mode_embeds_context_verbatim() {
        let composer = AnswerComposer::local();
        let answer = composer.compose("What is the home loan rate?", &sample_chunks()).await;

        assert!(answer.contains("[Source 1]: Home loans offer rates from 8%."));
        assert!(answer.starts_with("Based on the following context"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_yields_no_context_answer() {
        let composer = AnswerComposer::local();
        let answer = composer.compose("anything", &[]).await;
        assert_eq!(answer, NO_CONTEXT_ANSWER);
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionService for FailingCompletion {
        async fn complete(&self, _query: &str, _context: &str) -> anyhow::Result<String> {
            Err(anyhow!("simulated timeout"))
        }
    }

    #[tokio::test]
    async fn test_completion_failure_degrades_to_fallback() {
        let composer = AnswerComposer::with_completion(Arc::new(FailingCompletion));
        let answer = composer.compose("What is the home loan rate?", &sample_chunks()).await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    struct EchoCompletion;

    #[async_trait]
    impl CompletionService for EchoCompletion {
        async fn complete(&self, query: &str, _context: &str) -> anyhow::Result<String> {
            Ok(format!("echo: {query}"))
        }
    }

    #[tokio::test]
    async fn test_delegated_mode_returns_service_response_verbatim() {
        let composer = AnswerComposer::with_completion(Arc::new(EchoCompletion));
        let answer = composer.compose("rate?", &sample_chunks()).await;
        assert_eq!(answer, "echo: rate?");
    }

    #[tokio::test]
    async fn test_openrouter_completion_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant",
                                 "content": "Home loan rates start from 8% [Source 1]."}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = OpenRouterCompletion::new(CompletionConfig::new(
            server.uri(),
            "openai/gpt-3.5-turbo",
            "sk-test",
        ))
        .unwrap();

        let answer = service
            .complete("What is the home loan rate?", "[Source 1]: ...")
            .await
            .unwrap();
        assert_eq!(answer, "Home loan rates start from 8% [Source 1].");
    }

    #[tokio::test]
    async fn test_openrouter_error_status_reaches_composer_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = OpenRouterCompletion::new(CompletionConfig::new(
            server.uri(),
            "openai/gpt-3.5-turbo",
            "sk-test",
        ))
        .unwrap();

        let composer = AnswerComposer::with_completion(Arc::new(service));
        let answer = composer.compose("rate?", &sample_chunks()).await;
        assert_eq!(answer, FALLBACK_ANSWER);
    }
}
