//! Dialogue orchestration.
//!
//! [`DialogueOrchestrator`] owns a single NPC conversation: the persona, the
//! lore corpus, the prompt history and the display transcript. Input
//! surfaces (text box, push-to-talk) call [`DialogueOrchestrator::submit`];
//! anything that needs to react to the conversation subscribes to the state
//! watch channel or the [`DialogueEvent`] stream.

mod events;
mod orchestrator;
mod state;

pub use events::{DialogueEvent, EventReceiver, EventSender, event_channel};
pub use orchestrator::{DialogueOrchestrator, DialogueOrchestratorBuilder, NPC_ROLE, PLAYER_ROLE};
pub use state::{
    DialogueState, FALLBACK_MESSAGE, IgnoredReason, SubmitOutcome, TurnFailure, TurnReport,
};
