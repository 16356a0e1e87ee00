//! Retrieval-augmented prompt construction
//!
//! A prompt is a fixed sequence of labeled blocks:
//!
//! ```text
//! ### System ###
//! ### Assistant Role ###
//! ### Context ###
//! ### Conversation History ###
//! ### Question ###
//! ```
//!
//! The dialogue orchestrator seeds a fresh [`PromptBuilder`] from the
//! [`Persona`] on every turn, adds that turn's retrieved context and
//! question, and renders it against the current [`ConversationLog`].
//!
//! [`ConversationLog`]: crate::conversation::ConversationLog

mod builder;
mod persona;

pub use builder::{PromptBuilder, PromptDraft, Section};
pub use persona::Persona;
