//! Dialogue events
//!
//! An input surface or audio player subscribes to these to follow a
//! conversation without polling the orchestrator:
//!
//! - [`DialogueEvent::StateChanged`] - the orchestrator went Idle or Busy
//! - [`DialogueEvent::PlayerSaid`] / [`DialogueEvent::NpcSaid`] - a line reached the transcript
//! - [`DialogueEvent::TurnFailed`] - a turn ended on the fallback message
//! - [`DialogueEvent::SpeechReady`] / [`DialogueEvent::SpeechFailed`] - synthesis for an answer finished
//!
//! Events are sent with `try_send`; a full or closed channel drops the event
//! rather than stalling a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::speech::AudioClip;

use super::DialogueState;

/// Events emitted while a conversation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueEvent {
    StateChanged {
        state: DialogueState,
        timestamp: DateTime<Utc>,
    },

    PlayerSaid {
        turn_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    NpcSaid {
        turn_id: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    TurnFailed {
        turn_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Synthesized audio for an NPC answer
    SpeechReady {
        turn_id: String,
        #[serde(skip)]
        clip: AudioClip,
        timestamp: DateTime<Utc>,
    },

    SpeechFailed {
        turn_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl DialogueEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DialogueEvent::StateChanged { .. } => "state_changed",
            DialogueEvent::PlayerSaid { .. } => "player_said",
            DialogueEvent::NpcSaid { .. } => "npc_said",
            DialogueEvent::TurnFailed { .. } => "turn_failed",
            DialogueEvent::SpeechReady { .. } => "speech_ready",
            DialogueEvent::SpeechFailed { .. } => "speech_failed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DialogueEvent::StateChanged { timestamp, .. }
            | DialogueEvent::PlayerSaid { timestamp, .. }
            | DialogueEvent::NpcSaid { timestamp, .. }
            | DialogueEvent::TurnFailed { timestamp, .. }
            | DialogueEvent::SpeechReady { timestamp, .. }
            | DialogueEvent::SpeechFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Turn this event belongs to, if any
    pub fn turn_id(&self) -> Option<&str> {
        match self {
            DialogueEvent::StateChanged { .. } => None,
            DialogueEvent::PlayerSaid { turn_id, .. }
            | DialogueEvent::NpcSaid { turn_id, .. }
            | DialogueEvent::TurnFailed { turn_id, .. }
            | DialogueEvent::SpeechReady { turn_id, .. }
            | DialogueEvent::SpeechFailed { turn_id, .. } => Some(turn_id),
        }
    }
}

pub type EventSender = mpsc::Sender<DialogueEvent>;

pub type EventReceiver = mpsc::Receiver<DialogueEvent>;

/// Create a bounded event channel
pub fn event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(buffer_size)
}

/// Non-blocking sender that tolerates having no subscriber.
#[derive(Clone, Default)]
pub(crate) struct EventEmitter {
    sender: Option<EventSender>,
}

impl EventEmitter {
    pub(crate) fn new(sender: Option<EventSender>) -> Self {
        Self { sender }
    }

    pub(crate) fn emit(&self, event: DialogueEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(e) = sender.try_send(event) {
            tracing::trace!(error = %e, "Dropped dialogue event");
        }
    }

    pub(crate) fn state_changed(&self, state: DialogueState) {
        self.emit(DialogueEvent::StateChanged {
            state,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn player_said(&self, turn_id: &str, text: &str) {
        self.emit(DialogueEvent::PlayerSaid {
            turn_id: turn_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn npc_said(&self, turn_id: &str, text: &str) {
        self.emit(DialogueEvent::NpcSaid {
            turn_id: turn_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn turn_failed(&self, turn_id: &str, error: &str) {
        self.emit(DialogueEvent::TurnFailed {
            turn_id: turn_id.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn speech_ready(&self, turn_id: &str, clip: AudioClip) {
        self.emit(DialogueEvent::SpeechReady {
            turn_id: turn_id.to_string(),
            clip,
            timestamp: Utc::now(),
        });
    }

    pub(crate) fn speech_failed(&self, turn_id: &str, error: &str) {
        self.emit(DialogueEvent::SpeechFailed {
            turn_id: turn_id.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DialogueEvent::NpcSaid {
            turn_id: "turn-1".to_string(),
            text: "Welcome, traveler.".to_string(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"npc_said\""));

        let back: DialogueEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.turn_id(), Some("turn-1"));
        assert_eq!(back.event_type(), "npc_said");
    }

    #[test]
    fn test_emitter_without_sender_is_noop() {
        EventEmitter::default().state_changed(DialogueState::Busy);
    }

    #[tokio::test]
    async fn test_full_channel_drops_events() {
        let (tx, mut rx) = event_channel(1);
        let emitter = EventEmitter::new(Some(tx));

        emitter.player_said("t", "first");
        emitter.player_said("t", "second");

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, DialogueEvent::PlayerSaid { ref text, .. } if text == "first"));
        assert!(rx.try_recv().is_err());
    }
}
