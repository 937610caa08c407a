//! Error types for the knowledge-base search CLI.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to configuration loading and validation.
///
/// Configuration errors are fatal at construction time: an invalid
/// chunk/overlap pair or index parameter set never produces a partially
/// working pipeline.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to corpus ingestion.
///
/// Per-file failures are logged and skipped by the loader; only
/// whole-directory failures surface as errors.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("no readable documents found in {0}")]
    NoDocuments(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Server errors might be transient (e.g., 503 Service Unavailable)
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            // Request errors depend on the underlying cause
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            // Invalid responses are not retryable
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the vector index state machine.
///
/// These indicate caller misuse (train-twice, add-before-train,
/// search-before-populate) or data that violates the index contract.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector dimension must be greater than zero")]
    InvalidDimension,

    #[error("invalid index parameters: {0}")]
    InvalidParams(String),

    #[error("index is already trained")]
    AlreadyTrained,

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("index must be trained before vectors are added")]
    NotTrained,

    #[error("flat index does not require training")]
    TrainingNotRequired,

    #[error("index contains no vectors")]
    NotPopulated,

    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Errors from the answer-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to connect to generation service: {0}")]
    ConnectionError(String),

    #[error("generation service error: {0}")]
    ServerError(String),

    #[error("generation request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid generation response: {0}")]
    InvalidResponse(String),

    #[error("missing API key (set OPENAI_API_KEY or [generation] api_key)")]
    MissingApiKey,
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::ConnectionError(_) => true,
            GenerationError::ServerError(msg) => {
                msg.contains("503") || msg.contains("502") || msg.contains("429")
            }
            GenerationError::RequestError(e) => e.is_timeout() || e.is_connect(),
            GenerationError::InvalidResponse(_) | GenerationError::MissingApiKey => false,
        }
    }
}

/// Errors related to retrieval operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("retrieval deadline exceeded")]
    DeadlineExceeded,
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Other(String),
}
