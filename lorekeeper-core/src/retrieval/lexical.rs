//! Bag-of-words similarity scorer
//!
//! Lets the engine run without an embedding model: texts are reduced to
//! lowercase content words (stop words removed, plural `s` folded) and
//! compared by cosine similarity of their term counts.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

use super::SimilarityScorer;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "at", "be", "by", "can", "do", "does", "for", "from", "how", "i",
    "in", "is", "it", "me", "my", "of", "on", "or", "so", "the", "there", "to", "was", "what",
    "when", "where", "which", "who", "why", "will", "with", "you", "your",
];

/// Term-frequency cosine scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Similarity in `[0, 1]`
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let a = term_counts(a);
        let b = term_counts(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let dot: f32 = a
            .iter()
            .filter_map(|(term, count)| b.get(term).map(|other| (count * other) as f32))
            .sum();
        let norm = |counts: &HashMap<String, usize>| {
            counts
                .values()
                .map(|c| (c * c) as f32)
                .sum::<f32>()
                .sqrt()
        };

        (dot / (norm(&a) * norm(&b))).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl SimilarityScorer for LexicalScorer {
    async fn score(&self, query: &str, candidate: &str) -> Result<f32> {
        Ok(self.similarity(query, candidate))
    }
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(fold_plural(word)).or_insert(0) += 1;
    }
    counts
}

fn fold_plural(word: String) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word
    }
}
