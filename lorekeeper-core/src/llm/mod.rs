//! Text generation backends
//!
//! The dialogue orchestrator hands a fully rendered prompt to a
//! [`GenerationBackend`] and gets the NPC's answer back as plain text.

use async_trait::async_trait;

use crate::error::Result;

pub mod jsonl;
pub mod providers;
pub mod retry;

pub use jsonl::{AssembledResponse, ResponseAssembler, parse_json_lines};
pub use providers::OllamaBackend;
pub use retry::{RetryConfig, with_retry};

/// Trait for text generation services.
///
/// Implementations may suspend on network I/O. They must eventually resolve:
/// either with the generated text or with a `Network`/`Timeout` error.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for a rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}
