//! The RideDesk agent: one passenger call from utterance to spoken reply.
//!
//! 1. **Ingest** an utterance (transcribed audio or typed text)
//! 2. **Complete** over a window of the conversation via the provider
//! 3. **If actions are requested**: execute them, record request/result
//!    pairs, go back to step 2 (bounded)
//! 4. **If text**: record it, synthesize it, play it
//!
//! Repeated silence ends the session with a farewell.

pub mod completion;
pub mod dialogue;
pub mod disengagement;
pub mod executor;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use completion::CompletionClient;
pub use dialogue::{DialogueLoop, DialogueOutcome, FALLBACK_ANSWER};
pub use disengagement::{DisengagementPolicy, FAREWELL};
pub use executor::ActionExecutor;
pub use session::{Reply, Session};

use ridedesk_config::AppConfig;
use ridedesk_core::action::ActionRegistry;
use ridedesk_core::event::EventBus;
use ridedesk_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Wire a dialogue loop from configuration.
pub fn dialogue_from_config(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    registry: Arc<ActionRegistry>,
    event_bus: Arc<EventBus>,
) -> DialogueLoop {
    let executor = ActionExecutor::new(registry, event_bus.clone())
        .with_timeout(Duration::from_secs(config.actions.timeout_secs));
    DialogueLoop::new(
        CompletionClient::new(provider, config.generation.clone()),
        executor,
        config.dialogue.clone(),
        event_bus,
    )
}
