//! Static lore corpus

use std::path::Path;

use crate::error::{LorekeeperError, Result};

/// Ordered lore snippets, one per source line. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    lines: Vec<String>,
}

impl Corpus {
    /// Split newline-delimited text into snippets.
    ///
    /// Trailing `\r` is stripped and blank lines are dropped; order is kept.
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    /// Build from already-split snippets
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Read a lore file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LorekeeperError::Configuration(format!(
                "Failed to read corpus {}: {}",
                path.display(),
                e
            ))
        })?;
        let corpus = Self::from_text(&text);
        tracing::info!(path = %path.display(), lines = corpus.len(), "Loaded lore corpus");
        Ok(corpus)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
