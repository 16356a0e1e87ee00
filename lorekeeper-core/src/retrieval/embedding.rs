//! Similarity scoring backed by an embedding provider

use async_trait::async_trait;
use std::sync::Arc;

use crate::embeddings::{EmbeddingProvider, cosine_similarity};
use crate::error::{LorekeeperError, Result};

use super::SimilarityScorer;

/// Scores a query/candidate pair by the cosine similarity of their
/// embeddings, clamped to `[0, 1]`.
pub struct EmbeddingScorer {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SimilarityScorer for EmbeddingScorer {
    async fn score(&self, query: &str, candidate: &str) -> Result<f32> {
        let embeddings = self.provider.embed_batch(&[query, candidate]).await?;
        match embeddings.as_slice() {
            [q, c] => Ok(cosine_similarity(q, c).clamp(0.0, 1.0)),
            other => Err(LorekeeperError::Retrieval(format!(
                "Expected 2 embeddings, got {}",
                other.len()
            ))),
        }
    }
}
