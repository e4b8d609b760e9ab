//! # RideDesk Core
//!
//! Domain types, traits, and error definitions for the RideDesk voice
//! booking agent. This crate has **no I/O implementations**: it defines the
//! model that every other crate implements against.
//!
//! - [`message`]: the append-only turn log of a session
//! - [`action`]: actions the model may request, and their registry
//! - [`provider`]: the completion backend and its tagged outcome
//! - [`voice`]: transcription, synthesis and playback seams
//! - [`event`]: domain events for observers

pub mod action;
pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod provider;
pub mod voice;

// Re-export key types at crate root for ergonomics
pub use action::{Action, ActionDescriptor, ActionRegistry, ActionRequest, ActionResult};
pub use error::{ActionError, Error, ProviderError, Result, VoiceError};
pub use event::{DomainEvent, EventBus};
pub use identity::Identity;
pub use message::{Conversation, ConversationId, Turn, TurnContent, TurnRole};
pub use provider::{CompletionOutcome, CompletionRequest, GenerationParams, Provider};
pub use voice::{AudioClip, AudioSink, SpokenAudio, Synthesizer, Transcriber, Transcript};
