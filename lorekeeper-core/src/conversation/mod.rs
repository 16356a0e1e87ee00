//! Conversation state
//!
//! Two records are kept per NPC:
//!
//! - [`ConversationLog`]: the `(role, content)` history rendered into the
//!   prompt, optionally capped.
//! - [`Transcript`]: the display surface shown to the player, which also
//!   receives fallback messages for failed turns.
//!
//! # Example
//!
//! ```rust
//! use lorekeeper_core::conversation::ConversationLog;
//!
//! let mut log = ConversationLog::new();
//! log.add_entry("User", "Who runs the mill?");
//! log.add_entry("NPC", "Old Berrick, same as always.");
//!
//! assert_eq!(
//!     log.formatted_history(),
//!     "User: Who runs the mill?\nNPC: Old Berrick, same as always.\n"
//! );
//! ```

mod log;
mod transcript;

pub use log::{ConversationEntry, ConversationLog};
pub use transcript::{DisplayLine, Speaker, Transcript};
