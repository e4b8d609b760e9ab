//! Error types for the RideDesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Errors from the three external collaborators (transcription, completion,
//! synthesis) end the current utterance and surface to the caller. Errors
//! from a single action invocation never leave the executor: they become
//! conversation content so the model can recover.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all RideDesk operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Startup ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- External collaborators ---
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(VoiceError),

    #[error("Completion unavailable: {0}")]
    CompletionUnavailable(#[from] ProviderError),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(VoiceError),

    #[error("Audio playback failed: {0}")]
    Playback(VoiceError),

    // --- Session lifecycle ---
    #[error("Session has ended; no further utterances are accepted")]
    SessionEnded,

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Failure of a single action invocation.
///
/// These are recoverable by dialogue: the executor renders them into the
/// action-result turn instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionError {
    #[error("Unknown action: {action_name}")]
    UnknownAction { action_name: String },

    #[error("Malformed arguments for {action_name}: {reason}")]
    MalformedArguments { action_name: String, reason: String },

    #[error("Action {action_name} failed: {cause}")]
    ExecutionFailed { action_name: String, cause: String },
}

impl ActionError {
    /// Shorthand used by action handlers when argument parsing fails.
    pub fn malformed(action_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedArguments {
            action_name: action_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand used by action handlers when their backend fails.
    pub fn failed(action_name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            action_name: action_name.into(),
            cause: cause.into(),
        }
    }

    /// The text the model sees in the action-result turn.
    ///
    /// Validation errors are descriptive so the model can correct the call.
    /// Backend causes are withheld; they are logged by the executor instead.
    pub fn conversational(&self) -> String {
        match self {
            Self::UnknownAction { action_name } => format!(
                "Error: there is no action named '{action_name}'. Only the listed actions can be called."
            ),
            Self::MalformedArguments { action_name, reason } => format!(
                "Error: the arguments for '{action_name}' were rejected ({reason}). \
                 Gather the missing details from the passenger and call it again."
            ),
            Self::ExecutionFailed { action_name, .. } => format!(
                "Error: '{action_name}' could not be completed by the booking system right now. \
                 Apologize to the passenger and suggest they call to complete the booking."
            ),
        }
    }
}

/// Errors from the speech collaborators and audio sinks.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Request to {service} failed: {reason}")]
    Request { service: String, reason: String },

    #[error("{service} returned status {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}
