//! Domain event system: decoupled observation of a session.
//!
//! The dialogue loop and session publish events as an utterance moves
//! through transcription, completion, actions and answer. Observers (the
//! CLI at debug verbosity, tests) subscribe without touching the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A passenger utterance was transcribed and appended
    UtteranceTranscribed {
        conversation_id: String,
        characters: usize,
        timestamp: DateTime<Utc>,
    },

    /// The completion collaborator replied
    CompletionReceived {
        conversation_id: String,
        /// "final_answer", "action_requested" or "empty"
        outcome: String,
        round_trip: u32,
        timestamp: DateTime<Utc>,
    },

    /// An action was executed (or refused)
    ActionExecuted {
        action_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The loop produced a user-facing answer
    AnswerProduced {
        conversation_id: String,
        round_trips: u32,
        timestamp: DateTime<Utc>,
    },

    /// The session stopped accepting utterances
    SessionEnded {
        conversation_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
