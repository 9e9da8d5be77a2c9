//! Embedding API clients for the supported providers

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::EmbeddingsConfig;
use crate::errors::Result;
use crate::errors::ShelterRagError;

/// What the embedding will be used for.
///
/// Query-time and index-time embeddings may legally differ for the same
/// text; the two modes must never be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Embedding a search query
    Query,
    /// Embedding a document at ingestion time
    Document,
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Google Gemini embeddings API (supports task types natively)
    Gemini,
    /// Ollama local embeddings (task type is advisory only)
    Ollama,
}

/// Text-to-vector collaborator seam
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate a fixed-length embedding for `text`.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>>;
}

/// Client for generating embeddings from the configured provider
pub struct EmbeddingClient {
    provider: EmbeddingProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client from configuration
    ///
    /// # Errors
    /// - Unknown provider name
    /// - HTTP client build errors
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "gemini" => EmbeddingProvider::Gemini,
            "ollama" => EmbeddingProvider::Ollama,
            other => {
                return Err(ShelterRagError::Config(format!(
                    "Unknown embedding provider: {other}"
                )))
            }
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        Ok(Self {
            provider,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Get the provider
    #[must_use]
    pub const fn provider(&self) -> EmbeddingProvider {
        self.provider
    }

    /// Generate embedding using the Gemini API
    async fn embed_gemini(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ShelterRagError::Config("Gemini API key not provided".to_string()))?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }

        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GeminiRequest<'a> {
            model: String,
            content: Content<'a>,
            task_type: &'a str,
        }

        #[derive(Deserialize)]
        struct GeminiResponse {
            embedding: EmbeddingValues,
        }

        #[derive(Deserialize)]
        struct EmbeddingValues {
            values: Vec<f32>,
        }

        let task_type = match task {
            EmbeddingTask::Query => "RETRIEVAL_QUERY",
            EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        };

        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.endpoint, self.model, api_key
        );
        debug!("Calling Gemini embeddings API ({task_type})");

        let request = GeminiRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
            task_type,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShelterRagError::Embedding(format!(
                "Gemini API error ({status}): {error_text}"
            )));
        }

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ShelterRagError::Embedding(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding.values)
    }

    /// Generate embedding using the Ollama API
    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShelterRagError::Embedding(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ShelterRagError::Embedding(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingBackend for EmbeddingClient {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        match self.provider {
            EmbeddingProvider::Gemini => self.embed_gemini(text, task).await,
            // Ollama has no task-type concept; the same vector serves both
            EmbeddingProvider::Ollama => self.embed_ollama(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(provider: &str) -> EmbeddingsConfig {
        EmbeddingsConfig {
            provider: provider.to_string(),
            model: "text-embedding-004".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/".to_string(),
            api_key: Some("test".to_string()),
            dimension: 768,
        }
    }

    #[test]
    fn test_provider_parsing() {
        let client = EmbeddingClient::new(&test_config("gemini")).unwrap();
        assert_eq!(client.provider(), EmbeddingProvider::Gemini);

        let client = EmbeddingClient::new(&test_config("Ollama")).unwrap();
        assert_eq!(client.provider(), EmbeddingProvider::Ollama);

        assert!(EmbeddingClient::new(&test_config("openai")).is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = EmbeddingClient::new(&test_config("gemini")).unwrap();
        assert!(!client.endpoint.ends_with('/'));
    }
}
