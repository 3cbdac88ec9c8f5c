//! Google Generative Language API backend.

use async_trait::async_trait;
use atelier_core::config::BackendConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::CompletionBackend;
use crate::error::CompletionError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Backend calling `models/{model}:generateContent`.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiBackend {
    /// Build the backend, reading the API key from the environment variable
    /// named in `config.api_key_env`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CompletionError::BackendUnavailable(format!("{} is not set", config.api_key_env))
            })?;
        Self::new(config, api_key)
    }

    /// Build the backend with an explicit API key.
    pub fn new(config: &BackendConfig, api_key: impl Into<String>) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .build()
            .map_err(|e| CompletionError::BackendUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .map(|candidate| {
            candidate
                .content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Gemini request");

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        let text = extract_text(&parsed);
        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}
