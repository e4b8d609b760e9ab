//! The dialogue loop: completion → actions → completion → ... → answer.
//!
//! For one user utterance the loop alternates between asking the model
//! for a reply and executing the actions it requests, until the model
//! answers in plain text or the round-trip bound is hit.
//!
//! Every action request is appended to the conversation immediately
//! before its result.

use chrono::Utc;
use ridedesk_config::DialogueConfig;
use ridedesk_core::action::ActionDescriptor;
use ridedesk_core::error::{Error, ProviderError, Result};
use ridedesk_core::event::{DomainEvent, EventBus};
use ridedesk_core::message::{Conversation, Turn};
use ridedesk_core::provider::CompletionOutcome;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::completion::CompletionClient;
use crate::executor::ActionExecutor;

/// Answer given when the model keeps requesting actions past the bound.
pub const FALLBACK_ANSWER: &str = "I'm sorry, I'm having trouble finishing that booking right now. \
    Could you repeat what you need, or call our office to complete the reservation?";

/// Longest wait honored from a rate-limit `retry-after`.
const MAX_RETRY_WAIT: Duration = Duration::from_secs(10);

/// How an utterance ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum DialogueOutcome {
    /// The model produced a user-facing reply
    Answered(String),
    /// The round-trip bound was hit; the fallback was recorded instead
    BoundExceeded(String),
    /// The model returned neither text nor actions; nothing was recorded
    Empty,
    /// The session ended for lack of engagement; the farewell was recorded
    Disengaged(String),
}

impl DialogueOutcome {
    /// The text to speak and show, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Answered(text) | Self::BoundExceeded(text) | Self::Disengaged(text) => {
                Some(text)
            }
            Self::Empty => None,
        }
    }
}

pub struct DialogueLoop {
    client: CompletionClient,
    executor: ActionExecutor,
    config: DialogueConfig,
    event_bus: Arc<EventBus>,
}

impl DialogueLoop {
    pub fn new(
        client: CompletionClient,
        executor: ActionExecutor,
        config: DialogueConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            client,
            executor,
            config,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Drive the conversation until the model answers.
    ///
    /// The completion collaborator is called at most `max_round_trips + 1`
    /// times. If the last permitted call still asks for actions, none of
    /// them run and [`FALLBACK_ANSWER`] is recorded.
    pub async fn run(&self, conversation: &mut Conversation) -> Result<DialogueOutcome> {
        let descriptors = self.executor.registry().descriptors();
        let conversation_id = conversation.id().to_string();
        let mut round_trips: u32 = 0;

        loop {
            let outcome = self.complete_with_retry(conversation, &descriptors).await?;

            self.event_bus.publish(DomainEvent::CompletionReceived {
                conversation_id: conversation_id.clone(),
                outcome: outcome_kind(&outcome).into(),
                round_trip: round_trips,
                timestamp: Utc::now(),
            });

            match outcome {
                CompletionOutcome::FinalAnswer(text) => {
                    info!(conversation_id = %conversation_id, round_trips, answer = %text, "Answer produced");
                    conversation.push(Turn::assistant(text.clone()));
                    self.event_bus.publish(DomainEvent::AnswerProduced {
                        conversation_id,
                        round_trips,
                        timestamp: Utc::now(),
                    });
                    return Ok(DialogueOutcome::Answered(text));
                }

                CompletionOutcome::Empty => {
                    warn!(conversation_id = %conversation_id, round_trips, "Model returned neither text nor actions");
                    return Ok(DialogueOutcome::Empty);
                }

                CompletionOutcome::ActionRequested(requests)
                    if round_trips >= self.config.max_round_trips =>
                {
                    warn!(
                        conversation_id = %conversation_id,
                        round_trips,
                        pending = requests.len(),
                        "Round-trip bound reached, answering with fallback"
                    );
                    conversation.push(Turn::assistant(FALLBACK_ANSWER));
                    return Ok(DialogueOutcome::BoundExceeded(FALLBACK_ANSWER.into()));
                }

                CompletionOutcome::ActionRequested(requests) => {
                    round_trips += 1;
                    debug!(count = requests.len(), round_trips, "Executing requested actions");
                    for request in requests {
                        conversation.push(Turn::action_request(request.clone()));
                        let result = self.executor.execute(&request).await;
                        conversation.push(Turn::action_result(result));
                    }
                }
            }
        }
    }

    /// One completion, retrying transient provider failures.
    async fn complete_with_retry(
        &self,
        conversation: &Conversation,
        descriptors: &[ActionDescriptor],
    ) -> Result<CompletionOutcome> {
        let mut attempt: u32 = 0;
        loop {
            match self.client.complete(conversation, descriptors).await {
                Ok(outcome) => return Ok(outcome),
                Err(Error::CompletionUnavailable(e))
                    if e.is_transient() && attempt < self.config.completion_retries =>
                {
                    attempt += 1;
                    let wait = self.retry_wait(&e);
                    warn!(error = %e, attempt, wait_ms = wait.as_millis() as u64, "Completion failed, retrying");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn retry_wait(&self, error: &ProviderError) -> Duration {
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs).min(MAX_RETRY_WAIT))
            }
            _ => backoff,
        }
    }
}

fn outcome_kind(outcome: &CompletionOutcome) -> &'static str {
    match outcome {
        CompletionOutcome::FinalAnswer(_) => "final_answer",
        CompletionOutcome::ActionRequested(_) => "action_requested",
        CompletionOutcome::Empty => "empty",
    }
}
