//! Embedding client with bounded-batch dispatch.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;
use crate::utils::retry::{RetryConfig, with_retry};

/// Progress report handed to the batch observer after each dispatched batch.
///
/// Advisory only: callers use it to drive progress bars or watch resource
/// usage; the batcher itself enforces nothing.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    /// Zero-based index of the batch that just completed.
    pub batch_index: usize,
    /// Total number of batches for this call.
    pub batch_count: usize,
    /// Texts embedded so far, across all completed batches.
    pub texts_embedded: usize,
}

/// External embedding collaborator: text in, fixed-dimension vectors out,
/// in input order and dimensionally consistent across calls.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query. Defaults to a batch of one.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }
}

/// Request body for the /embed endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest {
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

/// Response from the /embed endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse(Vec<Vec<f32>>);

/// HTTP client for the embedding server.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    batch_size: usize,
    retry: RetryConfig,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            batch_size: (config.batch_size as usize).max(1),
            retry: RetryConfig::default(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Embed texts in input order, partitioned into `batch_size` batches
    /// dispatched sequentially so peak raw-text memory stays bounded;
    /// `observer` is invoked after each batch completes.
    pub async fn embed_with_observer(
        &self,
        texts: &[String],
        mut observer: impl FnMut(&BatchProgress) + Send,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_count = texts.len().div_ceil(self.batch_size);
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let embeddings = with_retry(&self.retry, || self.embed_single_batch(batch))
                .await
                .into_result()?;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            all_embeddings.extend(embeddings);

            observer(&BatchProgress {
                batch_index,
                batch_count,
                texts_embedded: all_embeddings.len(),
            });
        }

        Ok(all_embeddings)
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest {
            inputs: texts.to_vec(),
            truncate: Some(true),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        // Vectors must share one dimension; a ragged response indicates a
        // broken server and would corrupt the index downstream.
        if let Some(first) = embed_response.0.first() {
            let dim = first.len();
            if dim == 0 || embed_response.0.iter().any(|v| v.len() != dim) {
                return Err(EmbeddingError::InvalidResponse(
                    "inconsistent vector dimensions in response".to_string(),
                ));
            }
        }

        Ok(embed_response.0)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_with_observer(texts, |_| {}).await
    }
}
