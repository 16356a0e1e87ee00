//! # Lorekeeper - Retrieval-Augmented Dialogue for Game NPCs
//!
//! Lorekeeper lets a non-player character answer free-form questions with
//! help from a local language model:
//! - Lore retrieval against a line-oriented corpus
//! - Structured prompt assembly (persona, context, history, question)
//! - Generation through an Ollama-compatible JSON-Lines endpoint
//! - Bounded conversation history and a display transcript
//! - Speech synthesis and push-to-talk transcription behind traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lorekeeper_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = LorekeeperConfig::load()?;
//!     let npc = DialogueOrchestrator::builder()
//!         .persona(Persona::with_role("You are Mara, the village blacksmith."))
//!         .corpus(Corpus::load("lore.txt")?)
//!         .backend(Arc::new(OllamaBackend::from_config(&config.backend)))
//!         .config(config)
//!         .build()?;
//!
//!     if let Some(reply) = npc.submit("When does the shop open?").await.reply() {
//!         println!("{}", reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `embeddings-local`: MiniLM sentence embeddings via fastembed, usable
//!   through [`retrieval::EmbeddingScorer`]

pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod retrieval;
pub mod speech;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::LorekeeperConfig;
    pub use crate::conversation::{ConversationEntry, ConversationLog, Speaker, Transcript};
    pub use crate::dialogue::{
        DialogueEvent, DialogueOrchestrator, DialogueState, IgnoredReason, SubmitOutcome,
        TurnReport, event_channel,
    };
    pub use crate::embeddings::EmbeddingProvider;
    pub use crate::error::{LorekeeperError, Result};
    pub use crate::llm::{GenerationBackend, OllamaBackend, RetryConfig};
    pub use crate::prompt::{Persona, PromptBuilder, PromptDraft};
    pub use crate::retrieval::{
        Corpus, EmbeddingScorer, LexicalScorer, SimilarityScorer, retrieve_context,
    };
    pub use crate::speech::{
        AudioCapture, AudioClip, SilentSynthesizer, SpeechSynthesizer, Transcriber, VoiceInput,
    };
}
