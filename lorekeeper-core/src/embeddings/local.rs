//! Local embedding provider using fastembed

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{LorekeeperError, Result};

use super::EmbeddingProvider;

/// Local embedding provider using fastembed (runs locally, no API needed).
///
/// Inference is CPU-bound and runs on tokio's blocking pool.
pub struct LocalEmbeddings {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
}

impl LocalEmbeddings {
    /// Model used when none is configured (the MiniLM the game shipped with)
    pub const DEFAULT_MODEL: &'static str = "all-MiniLM-L12-v2";

    /// Create a new local embeddings provider with the specified model.
    ///
    /// # Arguments
    ///
    /// * `model_name` - Name of the model (e.g., "all-MiniLM-L12-v2")
    ///
    /// # Errors
    ///
    /// Returns an error if the model name is unknown or the model cannot be loaded.
    pub fn new(model_name: impl Into<String>) -> Result<Self> {
        let model_name = model_name.into();

        let (embedding_model, dimension) = match model_name.to_lowercase().as_str() {
            "all-minilm-l6-v2" => (fastembed::EmbeddingModel::AllMiniLML6V2, 384),
            "all-minilm-l12-v2" => (fastembed::EmbeddingModel::AllMiniLML12V2, 384),
            "bge-small-en-v1.5" => (fastembed::EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (fastembed::EmbeddingModel::BGEBaseENV15, 768),
            _ => {
                return Err(LorekeeperError::Configuration(format!(
                    "Unsupported embedding model '{}'. Supported: all-MiniLM-L6-v2, \
                     all-MiniLM-L12-v2, bge-small-en-v1.5, bge-base-en-v1.5",
                    model_name
                )));
            }
        };

        // InitOptions is non-exhaustive
        let mut init_options = fastembed::InitOptions::default();
        init_options.model_name = embedding_model;

        let model = fastembed::TextEmbedding::try_new(init_options).map_err(|e| {
            LorekeeperError::Configuration(format!(
                "Failed to load embedding model '{}': {}",
                model_name, e
            ))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }

    /// Load [`Self::DEFAULT_MODEL`]
    pub fn with_default_model() -> Result<Self> {
        Self::new(Self::DEFAULT_MODEL)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings.pop().ok_or_else(|| {
            LorekeeperError::Retrieval("Embedding generation returned empty result".to_string())
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let model = Arc::clone(&self.model);

        tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|e| {
                LorekeeperError::Retrieval(format!("Failed to lock embedding model: {}", e))
            })?;
            model.embed(texts, None).map_err(|e| {
                LorekeeperError::Retrieval(format!("Failed to generate embeddings: {}", e))
            })
        })
        .await
        .map_err(|e| LorekeeperError::Retrieval(format!("Embedding task failed: {}", e)))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
