//! Error types for Lorekeeper operations

use std::time::Duration;

/// Result type for Lorekeeper operations
pub type Result<T> = std::result::Result<T, LorekeeperError>;

/// Error types for the dialogue engine
#[derive(Debug, thiserror::Error)]
pub enum LorekeeperError {
    /// Input rejected before a turn started (empty query, busy orchestrator)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generation backend unreachable or answered with a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// Generation backend did not answer in time
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// In-flight work was cancelled by shutdown
    #[error("Operation cancelled")]
    Cancelled,

    /// A single JSON-Lines fragment could not be parsed
    #[error("Malformed response line {line_number}: {reason}")]
    MalformedResponseLine { line_number: usize, reason: String },

    /// Speech synthesis or transcription failed
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// Similarity scoring failed during context retrieval
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LorekeeperError {
    /// Whether the error came from talking to the generation backend.
    ///
    /// Only these failures are eligible for retry.
    pub fn is_network(&self) -> bool {
        matches!(self, LorekeeperError::Network(_))
    }
}

impl From<String> for LorekeeperError {
    fn from(s: String) -> Self {
        LorekeeperError::Other(s)
    }
}

impl From<&str> for LorekeeperError {
    fn from(s: &str) -> Self {
        LorekeeperError::Other(s.to_string())
    }
}

impl From<reqwest::Error> for LorekeeperError {
    fn from(err: reqwest::Error) -> Self {
        LorekeeperError::Network(err.to_string())
    }
}
