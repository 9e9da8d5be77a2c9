//! Generation API clients for the supported providers

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::streaming;
use super::streaming::TokenStream;
use crate::config::LlmConfig;
use crate::errors::Result;
use crate::errors::ShelterRagError;

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProvider {
    /// Ollama `/api/generate`, NDJSON framing
    Ollama,
    /// OpenAI-compatible chat completions, SSE framing
    OpenAi,
}

/// Generative-text collaborator seam
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a complete response.
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: usize)
        -> Result<String>;

    /// Generate incrementally. Chunks become available as the backend
    /// produces them; dropping the stream stops consumption.
    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<TokenStream>;
}

/// Client for the configured generation provider
pub struct GenerationClient {
    provider: GenerationProvider,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiContent>,
    #[serde(default)]
    delta: Option<OpenAiContent>,
}

#[derive(Deserialize, Default)]
struct OpenAiContent {
    #[serde(default)]
    content: Option<String>,
}

impl GenerationClient {
    /// Create a new generation client from configuration
    ///
    /// # Errors
    /// - Unknown provider name
    /// - HTTP client build errors
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let provider = match config.provider.to_ascii_lowercase().as_str() {
            "ollama" => GenerationProvider::Ollama,
            "openai" => GenerationProvider::OpenAi,
            other => {
                return Err(ShelterRagError::Config(format!(
                    "Unknown generation provider: {other}"
                )))
            }
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
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
    pub const fn provider(&self) -> GenerationProvider {
        self.provider
    }

    async fn send_ollama(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!("Calling Ollama generate API: {} (stream={stream})", url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream,
            options: OllamaOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
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
            return Err(ShelterRagError::Generation(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        Ok(response)
    }

    async fn send_openai(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
        stream: bool,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} (stream={stream})", url);

        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![OpenAiMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
            stream,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ShelterRagError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ShelterRagError::Generation(format!(
                "Chat completions API error ({status}): {error_text}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        match self.provider {
            GenerationProvider::Ollama => {
                let response = self
                    .send_ollama(prompt, temperature, max_tokens, false)
                    .await?;
                let chunk: OllamaChunk = response.json().await.map_err(|e| {
                    ShelterRagError::Generation(format!("Failed to parse response: {e}"))
                })?;
                Ok(chunk.response)
            }
            GenerationProvider::OpenAi => {
                let response = self
                    .send_openai(prompt, temperature, max_tokens, false)
                    .await?;
                let parsed: OpenAiResponse = response.json().await.map_err(|e| {
                    ShelterRagError::Generation(format!("Failed to parse response: {e}"))
                })?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.and_then(|m| m.content))
                    .ok_or_else(|| {
                        ShelterRagError::Generation("No content in response".to_string())
                    })
            }
        }
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<TokenStream> {
        match self.provider {
            GenerationProvider::Ollama => {
                let response = self
                    .send_ollama(prompt, temperature, max_tokens, true)
                    .await?;
                let lines = streaming::lines(response.bytes_stream());
                let stream = try_stream! {
                    let mut lines = Box::pin(lines);
                    while let Some(line) = lines.next().await {
                        let line = line?;
                        let chunk: OllamaChunk =
                            serde_json::from_str(&line).map_err(|e| {
                                ShelterRagError::Generation(format!(
                                    "Malformed stream chunk: {e}"
                                ))
                            })?;
                        if !chunk.response.is_empty() {
                            yield chunk.response;
                        }
                        if chunk.done {
                            break;
                        }
                    }
                };
                Ok(Box::pin(stream))
            }
            GenerationProvider::OpenAi => {
                let response = self
                    .send_openai(prompt, temperature, max_tokens, true)
                    .await?;
                let lines = streaming::lines(response.bytes_stream());
                let stream = try_stream! {
                    let mut lines = Box::pin(lines);
                    while let Some(line) = lines.next().await {
                        let line = line?;
                        let Some(data) = line.strip_prefix("data:") else {
                            continue; // SSE comments and event fields
                        };
                        let data = data.trim();
                        if data == "[DONE]" {
                            break;
                        }
                        let parsed: OpenAiResponse =
                            serde_json::from_str(data).map_err(|e| {
                                ShelterRagError::Generation(format!(
                                    "Malformed stream chunk: {e}"
                                ))
                            })?;
                        if let Some(text) = parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.delta.and_then(|d| d.content))
                        {
                            if !text.is_empty() {
                                yield text;
                            }
                        }
                    }
                };
                Ok(Box::pin(stream))
            }
        }
    }
}
