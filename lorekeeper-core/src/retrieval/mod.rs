//! Context retrieval
//!
//! Selects the lore snippets relevant to a player's question. Every corpus
//! line is scored against the query by a [`SimilarityScorer`]; lines scoring
//! strictly above the confidence threshold are kept in corpus order.
//!
//! ```
//! use lorekeeper_core::retrieval::{Corpus, LexicalScorer, retrieve_context};
//!
//! let corpus = Corpus::from_text("The shop opens at 9am.\nDragons live in the north.");
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let hits = rt
//!     .block_on(retrieve_context(&LexicalScorer, "when does the shop open", corpus.lines(), 0.5))
//!     .unwrap();
//! assert_eq!(hits, vec!["The shop opens at 9am.".to_string()]);
//! ```

mod corpus;
mod embedding;
mod lexical;

pub use corpus::Corpus;
pub use embedding::EmbeddingScorer;
pub use lexical::LexicalScorer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default confidence threshold
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Pairwise text similarity.
///
/// Scores are expected in `[0, 1]`, higher meaning more related. An error
/// fails the whole retrieval.
#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn score(&self, query: &str, candidate: &str) -> Result<f32>;
}

/// A corpus line with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub text: String,
    pub score: f32,
}

/// Score every candidate against `query`, preserving candidate order.
pub async fn score_candidates(
    scorer: &dyn SimilarityScorer,
    query: &str,
    candidates: &[String],
) -> Result<Vec<ScoredCandidate>> {
    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let score = scorer.score(query, candidate).await?;
        scored.push(ScoredCandidate {
            text: candidate.clone(),
            score,
        });
    }
    Ok(scored)
}

/// Candidates whose score is strictly greater than `threshold`, in
/// candidate order.
///
/// Duplicated candidates are returned as many times as they qualify.
pub async fn retrieve_context(
    scorer: &dyn SimilarityScorer,
    query: &str,
    candidates: &[String],
    threshold: f32,
) -> Result<Vec<String>> {
    let scored = score_candidates(scorer, query, candidates).await?;

    let hits: Vec<String> = scored
        .into_iter()
        .filter(|c| c.score > threshold)
        .inspect(|c| tracing::debug!(score = c.score, text = %c.text, "Context hit"))
        .map(|c| c.text)
        .collect();

    tracing::debug!(
        candidates = candidates.len(),
        hits = hits.len(),
        threshold,
        "Retrieved context"
    );
    Ok(hits)
}
