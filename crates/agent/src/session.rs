//! One passenger call: ingestion in, dialogue, speech out.
//!
//! A session owns its conversation exclusively. Its methods take
//! `&mut self`, so each utterance is fully handled before the next one is
//! accepted.

use chrono::Utc;
use ridedesk_core::error::{Error, Result};
use ridedesk_core::event::DomainEvent;
use ridedesk_core::identity::Identity;
use ridedesk_core::message::{Conversation, Turn};
use ridedesk_core::voice::{AudioClip, AudioSink, NullSink, Synthesizer, Transcriber};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dialogue::{DialogueLoop, DialogueOutcome};
use crate::disengagement::{DisengagementPolicy, FAREWELL};

/// What one utterance produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    /// What the passenger said (as transcribed or typed)
    pub heard: String,
    pub outcome: DialogueOutcome,
}

impl Reply {
    pub fn text(&self) -> Option<&str> {
        self.outcome.reply_text()
    }
}

pub struct Session {
    conversation: Conversation,
    dialogue: DialogueLoop,
    transcriber: Option<Arc<dyn Transcriber>>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    sink: Arc<dyn AudioSink>,
    policy: DisengagementPolicy,
    disengaged: bool,
    ended: bool,
}

impl Session {
    pub fn new(identity: &Identity, dialogue: DialogueLoop, policy: DisengagementPolicy) -> Self {
        Self {
            conversation: Conversation::new(identity.system_prompt.clone()),
            dialogue,
            transcriber: None,
            synthesizer: None,
            sink: Arc::new(NullSink),
            policy,
            disengaged: false,
            ended: false,
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Speak replies through `synthesizer` into `sink`.
    pub fn with_voice(mut self, synthesizer: Arc<dyn Synthesizer>, sink: Arc<dyn AudioSink>) -> Self {
        self.synthesizer = Some(synthesizer);
        self.sink = sink;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether replies are synthesized.
    pub fn speaks(&self) -> bool {
        self.synthesizer.is_some()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Transcribe a clip and append it as a user turn.
    ///
    /// Blank transcripts are still recorded. On failure nothing is appended.
    pub async fn ingest_audio(&mut self, clip: &AudioClip) -> Result<String> {
        self.ensure_open()?;
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| Error::Internal("no transcriber configured for this session".into()))?;

        let transcript = transcriber
            .transcribe(clip)
            .await
            .map_err(Error::TranscriptionFailed)?;
        info!(conversation_id = %self.conversation.id(), transcript = %transcript.text, "Passenger said");

        self.dialogue
            .event_bus()
            .publish(DomainEvent::UtteranceTranscribed {
                conversation_id: self.conversation.id().to_string(),
                characters: transcript.text.chars().count(),
                timestamp: Utc::now(),
            });

        self.record_user(&transcript.text);
        Ok(transcript.text)
    }

    /// Append typed input as a user turn.
    pub fn ingest_text(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        info!(conversation_id = %self.conversation.id(), text = %text, "Passenger typed");
        self.record_user(text);
        Ok(())
    }

    /// Run the dialogue loop for the latest user turn.
    pub async fn respond(&mut self) -> Result<DialogueOutcome> {
        self.ensure_open()?;

        if self.disengaged {
            info!(conversation_id = %self.conversation.id(), "Passenger disengaged, ending session");
            self.conversation.push(Turn::assistant(FAREWELL));
            self.ended = true;
            self.dialogue.event_bus().publish(DomainEvent::SessionEnded {
                conversation_id: self.conversation.id().to_string(),
                reason: "disengaged".into(),
                timestamp: Utc::now(),
            });
            return Ok(DialogueOutcome::Disengaged(FAREWELL.into()));
        }

        self.dialogue.run(&mut self.conversation).await
    }

    /// Synthesize `text` and hand it to the sink. A no-op without a voice.
    pub async fn speak(&self, text: &str) -> Result<()> {
        let Some(synthesizer) = &self.synthesizer else {
            return Ok(());
        };

        let audio = synthesizer
            .synthesize(text)
            .await
            .map_err(Error::SynthesisFailed)?;
        debug!(bytes = audio.data.len(), sink = %self.sink.name(), "Playing reply");
        self.sink.play(&audio).await.map_err(Error::Playback)
    }

    /// Ingest → respond → speak for one recorded utterance.
    pub async fn handle_utterance(&mut self, clip: &AudioClip) -> Result<Reply> {
        let heard = self.ingest_audio(clip).await?;
        self.finish(heard).await
    }

    /// Ingest → respond → speak for one typed utterance.
    pub async fn handle_text(&mut self, text: &str) -> Result<Reply> {
        self.ingest_text(text)?;
        self.finish(text.to_string()).await
    }

    async fn finish(&mut self, heard: String) -> Result<Reply> {
        let outcome = self.respond().await?;
        if let Some(text) = outcome.reply_text() {
            self.speak(text).await?;
        }
        Ok(Reply { heard, outcome })
    }

    fn record_user(&mut self, text: &str) {
        self.conversation.push(Turn::user(text));
        if self.policy.observe(text) {
            self.disengaged = true;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.ended {
            return Err(Error::SessionEnded);
        }
        Ok(())
    }
}
