//! Turn outcomes and orchestrator state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::LorekeeperError;

/// Shown to the player when a turn fails
pub const FALLBACK_MESSAGE: &str = "Sorry, an error occurred. Please try again.";

/// Whether a turn is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueState {
    #[default]
    Idle,
    Busy,
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogueState::Idle => write!(f, "idle"),
            DialogueState::Busy => write!(f, "busy"),
        }
    }
}

/// Why a submission was dropped without starting a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredReason {
    /// Query was empty after trimming
    Empty,
    /// Another turn is in flight
    Busy,
    /// The orchestrator has been shut down
    ShutDown,
}

/// A completed turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn_id: Uuid,
    /// Normalized player question
    pub query: String,
    /// Lore lines that passed the confidence threshold, in corpus order
    pub context: Vec<String>,
    pub prompt: String,
    pub response: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// A turn that ended on the fallback message
#[derive(Debug)]
pub struct TurnFailure {
    pub turn_id: Uuid,
    pub query: String,
    pub error: LorekeeperError,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Result of [`submit`](super::DialogueOrchestrator::submit)
#[derive(Debug)]
pub enum SubmitOutcome {
    Ignored(IgnoredReason),
    Answered(TurnReport),
    Failed(TurnFailure),
}

impl SubmitOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, SubmitOutcome::Answered(_))
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, SubmitOutcome::Ignored(_))
    }

    /// Text shown to the player for this turn, if a turn ran
    pub fn reply(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Answered(report) => Some(&report.response),
            SubmitOutcome::Failed(_) => Some(FALLBACK_MESSAGE),
            SubmitOutcome::Ignored(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        assert_eq!(serde_json::to_string(&DialogueState::Busy).unwrap(), "\"busy\"");
        assert_eq!(DialogueState::default(), DialogueState::Idle);
        assert_eq!(DialogueState::Idle.to_string(), "idle");
    }

    #[test]
    fn test_outcome_reply() {
        let failed = SubmitOutcome::Failed(TurnFailure {
            turn_id: Uuid::new_v4(),
            query: "hi".to_string(),
            error: LorekeeperError::Cancelled,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
        });
        assert_eq!(failed.reply(), Some(FALLBACK_MESSAGE));
        assert!(!failed.is_answered());

        let ignored = SubmitOutcome::Ignored(IgnoredReason::Empty);
        assert!(ignored.is_ignored());
        assert_eq!(ignored.reply(), None);
    }
}
