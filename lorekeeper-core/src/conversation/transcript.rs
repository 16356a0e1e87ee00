//! Display transcript: what the player sees in the dialogue box

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a transcript line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Player,
    Npc,
}

/// A line shown on the display surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayLine {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ordered record of everything shown to the player, including fallback
/// messages for failed turns. Independent from the prompt history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    lines: Vec<DisplayLine>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line and return a copy of it
    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) -> DisplayLine {
        let line = DisplayLine {
            speaker,
            text: text.into(),
            at: Utc::now(),
        };
        self.lines.push(line.clone());
        line
    }

    /// All lines, oldest first
    pub fn lines(&self) -> &[DisplayLine] {
        &self.lines
    }

    /// Most recent line
    pub fn last(&self) -> Option<&DisplayLine> {
        self.lines.last()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
