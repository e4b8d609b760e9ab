//! Completion client: windows the history and calls the provider.

use ridedesk_core::action::ActionDescriptor;
use ridedesk_core::error::{Error, Result};
use ridedesk_core::message::Conversation;
use ridedesk_core::provider::{CompletionOutcome, CompletionRequest, GenerationParams, Provider};
use std::sync::Arc;
use tracing::debug;

pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    params: GenerationParams,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    /// One completion call over the windowed conversation.
    ///
    /// Any provider failure surfaces as [`Error::CompletionUnavailable`].
    pub async fn complete(
        &self,
        conversation: &Conversation,
        actions: &[ActionDescriptor],
    ) -> Result<CompletionOutcome> {
        let turns = conversation.window(self.params.max_context_turns);
        debug!(
            provider = %self.provider.name(),
            window = turns.len(),
            history = conversation.len(),
            "Requesting completion"
        );

        let request = CompletionRequest {
            turns,
            actions: actions.to_vec(),
            params: self.params.clone(),
        };

        self.provider
            .complete(request)
            .await
            .map_err(Error::CompletionUnavailable)
    }
}
