//! Answer-generation client (OpenAI-style chat completions).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GenerationError;
use crate::models::{GenerationConfig, ScoredPassage};

/// External answer-generation collaborator. Treated as opaque; callers
/// degrade failures into a user-visible message instead of propagating.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        query: &str,
        passages: &[ScoredPassage],
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP client for the chat-completions endpoint.
pub struct AnswerClient {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl AnswerClient {
    /// Create a client. The API key comes from config or, failing that,
    /// the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    /// Build the grounding prompt: numbered passages followed by the
    /// question and answering instructions.
    fn build_prompt(query: &str, passages: &[ScoredPassage]) -> String {
        let context: Vec<String> = passages
            .iter()
            .enumerate()
            .map(|(i, sp)| format!("[Source {}] {}", i + 1, sp.passage.content))
            .collect();

        format!(
            "You are a knowledgeable assistant. Answer the user's question using only \
             the source passages below.\n\nSources:\n{}\n\nQuestion: {}\n\n\
             Requirements:\n\
             1. Base the answer on the provided sources; do not invent information.\n\
             2. If the sources do not cover the question, say so honestly.\n\
             3. Be accurate, concise, and helpful.\n\
             4. Quote sources where appropriate.\n\nAnswer:",
            context.join("\n\n"),
            query
        )
    }
}

#[async_trait]
impl AnswerGenerator for AnswerClient {
    async fn generate(
        &self,
        query: &str,
        passages: &[ScoredPassage],
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_prompt(query, passages),
            }],
            temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(GenerationError::RequestError)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;
    use serde_json::Map;

    fn scored(content: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            passage: Passage::new(content.to_string(), "test.txt", 0, content.len(), 0, Map::new()),
            score,
        }
    }

    #[test]
    fn test_prompt_numbers_sources_in_order() {
        let passages = vec![scored("first passage", 0.9), scored("second passage", 0.8)];
        let prompt = AnswerClient::build_prompt("what is grace?", &passages);

        let p1 = prompt.find("[Source 1] first passage").unwrap();
        let p2 = prompt.find("[Source 2] second passage").unwrap();
        assert!(p1 < p2);
        assert!(prompt.contains("Question: what is grace?"));
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let config = GenerationConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        // An explicitly empty key must not silently produce a client;
        // only fails when the env var is also unset.
        if std::env::var("OPENAI_API_KEY").is_err() {
            assert!(matches!(
                AnswerClient::new(&config),
                Err(GenerationError::MissingApiKey)
            ));
        }
    }

    #[test]
    fn test_config_key_takes_precedence() {
        let config = GenerationConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let client = AnswerClient::new(&config).unwrap();
        assert_eq!(client.api_key, "sk-test");
    }
}
