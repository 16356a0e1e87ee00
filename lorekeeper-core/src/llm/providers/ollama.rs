//! Ollama generation backend (local, free, runs on your machine)

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{LorekeeperError, Result};
use crate::llm::jsonl::ResponseAssembler;
use crate::llm::retry::{RetryConfig, with_retry};
use crate::llm::{GenerationBackend, ModelInfo};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:8b";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for Ollama's `/api/generate` endpoint.
///
/// The server streams its answer as JSON Lines; the body is consumed chunk
/// by chunk and reassembled with [`ResponseAssembler`].
pub struct OllamaBackend {
    client: reqwest::Client,
    model: String,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name (e.g., "llama3:8b")
    /// * `base_url` - Base URL for Ollama API (defaults to "http://localhost:11434")
    pub fn new(model: impl Into<String>, base_url: Option<impl Into<String>>) -> Self {
        let base_url = base_url
            .map(|u| u.into())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::no_retry(),
        }
    }

    /// Create with the game's defaults (llama3:8b on localhost:11434).
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MODEL, None::<String>)
    }

    /// Create from the `[backend]` configuration section.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.model.clone(), Some(config.base_url.clone()))
            .with_timeout(config.timeout)
            .with_retry(config.retry.clone())
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy for network failures
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Get the per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate_bounded(&self, prompt: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.generate_once(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LorekeeperError::Timeout(self.timeout)),
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
        };
        let url = self.endpoint();

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LorekeeperError::Network(format!(
                    "Failed to send request to {}: {}. Make sure Ollama is running.",
                    url, e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LorekeeperError::Network(format!(
                "Ollama API error ({}): {}",
                status, text
            )));
        }

        let mut assembler = ResponseAssembler::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                LorekeeperError::Network(format!("Failed to read Ollama response: {}", e))
            })?;
            assembler.push(&chunk);
        }

        let assembled = assembler.finish();
        tracing::debug!(
            model = %self.model,
            fragments = assembled.fragments,
            skipped_lines = assembled.skipped_lines,
            "Generation response assembled"
        );

        Ok(assembled.text)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        with_retry(&self.retry, || self.generate_bounded(prompt)).await
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "ollama".to_string(),
            model_name: self.model.clone(),
        }
    }
}
