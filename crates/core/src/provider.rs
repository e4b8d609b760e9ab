//! Provider trait: the abstraction over the chat-completion backend.
//!
//! A Provider sends a window of the conversation plus the action
//! descriptors to a language model and classifies the reply: either a
//! user-facing answer or a request to run actions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{ActionDescriptor, ActionRequest};
use crate::error::ProviderError;
use crate::message::Turn;

/// Generation parameters threaded through to the provider unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// The model to use (e.g., "gpt-3.5-turbo")
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,

    /// How many prior non-system turns go into the prompt window
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    500
}
fn default_top_p() -> f32 {
    1.0
}
fn default_presence_penalty() -> f32 {
    0.6
}
fn default_max_context_turns() -> usize {
    10
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: default_presence_penalty(),
            max_context_turns: default_max_context_turns(),
        }
    }
}

/// One completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The (already windowed) turns, system turn first
    pub turns: Vec<Turn>,

    /// Actions the model may request; the call mode is always "auto"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionDescriptor>,

    pub params: GenerationParams,
}

/// How the model replied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// A user-facing reply with no action request
    FinalAnswer(String),

    /// One or more actions to run before the model can continue
    ActionRequested(Vec<ActionRequest>),

    /// Neither text nor an action request
    Empty,
}

impl CompletionOutcome {
    /// Classify raw reply parts. Action requests win over text; blank text
    /// with no requests is `Empty`.
    pub fn classify(content: Option<String>, requests: Vec<ActionRequest>) -> Self {
        if !requests.is_empty() {
            return Self::ActionRequested(requests);
        }
        match content {
            Some(text) if !text.trim().is_empty() => Self::FinalAnswer(text),
            _ => Self::Empty,
        }
    }
}

/// The core Provider trait.
///
/// The dialogue loop calls `complete()` without knowing which backend is
/// behind it. Implementations must not retry; retry policy belongs to the
/// loop.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and classify the reply.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionOutcome, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_params_defaults() {
        let params = GenerationParams::default();
        assert!((params.temperature - 0.5).abs() < f32::EPSILON);
        assert_eq!(params.max_tokens, 500);
        assert!((params.presence_penalty - 0.6).abs() < f32::EPSILON);
        assert_eq!(params.max_context_turns, 10);
    }

    #[test]
    fn classify_prefers_action_requests() {
        let req = ActionRequest::new("call_1", "geocode", r#"{"streetAddress":"1 Main St"}"#);
        let outcome = CompletionOutcome::classify(Some("Let me look that up".into()), vec![req]);
        assert!(matches!(outcome, CompletionOutcome::ActionRequested(ref r) if r.len() == 1));
    }

    #[test]
    fn classify_blank_text_is_empty() {
        assert_eq!(CompletionOutcome::classify(None, vec![]), CompletionOutcome::Empty);
        assert_eq!(
            CompletionOutcome::classify(Some("  \n".into()), vec![]),
            CompletionOutcome::Empty
        );
    }

    #[test]
    fn classify_text_is_final_answer() {
        assert_eq!(
            CompletionOutcome::classify(Some("Where are you headed?".into()), vec![]),
            CompletionOutcome::FinalAnswer("Where are you headed?".into())
        );
    }
}
