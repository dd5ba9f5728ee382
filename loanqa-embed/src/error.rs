//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
/// Used throughout the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// The taxonomy mirrors how callers are expected to react:
///
/// - [`EmbedError::Unavailable`] is fatal to the current query or build but
///   never to the process; the backend was unreachable and retries are
///   already exhausted by the time this surfaces.
/// - [`EmbedError::EmptyInput`] means the caller should skip the text rather
///   than retry; embedding whitespace produces nothing useful.
/// - The remaining variants are configuration or runtime problems with the
///   local model backend.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The remote backend was unreachable and all retry attempts failed
    #[error("embedding backend unavailable after {attempts} attempt(s): {message}")]
    Unavailable { attempts: u32, message: String },

    /// The input text was empty or whitespace-only
    #[error("cannot embed empty or whitespace-only input")]
    EmptyInput,

    /// Error when model configuration is invalid
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create an [`EmbedError::Unavailable`] recording how many attempts were
    /// made and the last failure observed.
    pub fn unavailable(attempts: u32, message: impl Into<String>) -> Self {
        Self::Unavailable {
            attempts,
            message: message.into(),
        }
    }

    /// Create a model initialization error from any error type.
    pub fn model_init<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelInitialization {
            source: Box::new(source),
        }
    }

    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
