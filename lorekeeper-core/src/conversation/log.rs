//! Conversation log used for prompt history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single line of dialogue attributed to a speaker role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    role: String,
    content: String,
}

impl ConversationEntry {
    /// Create a new entry
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Speaker role, e.g. "User" or "NPC"
    pub fn role(&self) -> &str {
        &self.role
    }

    /// What was said
    pub fn content(&self) -> &str {
        &self.content
    }

    /// `"{role}: {content}"`
    pub fn formatted(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Append-only, chronologically ordered conversation history.
///
/// With a cap set, the oldest exchanges are evicted once the cap is
/// exceeded. An exchange opens with the role of the first entry ever added
/// (the player, in a dialogue), so a capped history never starts with an
/// orphaned reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationLog {
    entries: VecDeque<ConversationEntry>,
    max_entries: Option<usize>,
    #[serde(default)]
    opening_role: Option<String>,
}

impl ConversationLog {
    /// Create an unbounded log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that keeps at most `max_entries` entries (None = unbounded)
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            opening_role: None,
        }
    }

    /// Append an entry, evicting whole exchanges from the front if over the cap
    pub fn add_entry(&mut self, role: impl Into<String>, content: impl Into<String>) {
        let entry = ConversationEntry::new(role, content);
        if self.opening_role.is_none() {
            self.opening_role = Some(entry.role.clone());
        }
        self.entries.push_back(entry);

        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() <= max.max(1) {
            return;
        }
        while self.entries.len() > max.max(1) {
            self.entries.pop_front();
        }
        // Drop the tail of a partially evicted exchange
        while self
            .entries
            .front()
            .is_some_and(|front| Some(front.role()) != self.opening_role.as_deref())
        {
            self.entries.pop_front();
        }
    }

    /// Render as one `"{role}: {content}"` line per entry, oldest first.
    ///
    /// Returns an empty string for an empty log.
    pub fn formatted_history(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry.role());
            out.push_str(": ");
            out.push_str(entry.content());
            out.push('\n');
        }
        out
    }

    /// Iterate over entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured cap
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
        self.opening_role = None;
    }
}
