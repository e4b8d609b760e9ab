//! Scripted collaborators shared by the agent tests.

use async_trait::async_trait;
use ridedesk_core::action::ActionRequest;
use ridedesk_core::error::{ProviderError, VoiceError};
use ridedesk_core::provider::{CompletionOutcome, CompletionRequest, Provider};
use ridedesk_core::voice::{AudioClip, AudioSink, SpokenAudio, Synthesizer, Transcriber, Transcript};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted outcomes.
///
/// Each call to `complete` returns the next entry. Once the script runs out
/// the `repeat` outcome (if any) is returned forever; otherwise it panics.
pub struct SequentialMockProvider {
    script: Mutex<VecDeque<Result<CompletionOutcome, ProviderError>>>,
    repeat: Option<CompletionOutcome>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl SequentialMockProvider {
    pub fn new(script: Vec<Result<CompletionOutcome, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(CompletionOutcome::FinalAnswer(text.into()))])
    }

    /// First request the given actions, then answer.
    pub fn action_then_answer(requests: Vec<ActionRequest>, answer: &str) -> Self {
        Self::new(vec![
            Ok(CompletionOutcome::ActionRequested(requests)),
            Ok(CompletionOutcome::FinalAnswer(answer.into())),
        ])
    }

    /// Request the same action on every call.
    pub fn always_requesting(request: ActionRequest) -> Self {
        Self {
            repeat: Some(CompletionOutcome::ActionRequested(vec![request])),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionOutcome, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(outcome) => Ok(outcome.clone()),
            None => panic!("SequentialMockProvider: no more responses (call #{call})"),
        }
    }
}

pub fn geocode_request(call_id: &str, address: &str) -> ActionRequest {
    ActionRequest::new(
        call_id,
        "geocode",
        serde_json::json!({ "streetAddress": address }).to_string(),
    )
}

/// Returns scripted transcripts in order; an `Err` entry simulates an outage.
pub struct ScriptedTranscriber {
    script: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedTranscriber {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, _clip: &AudioClip) -> Result<Transcript, VoiceError> {
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(Transcript { text }),
            Some(Err(reason)) => Err(VoiceError::Request {
                service: "scripted".into(),
                reason,
            }),
            None => panic!("ScriptedTranscriber: no more transcripts"),
        }
    }
}

/// Echoes the text back as bytes and remembers what it was asked to say.
#[derive(Default)]
pub struct EchoSynthesizer {
    pub spoken: Mutex<Vec<String>>,
}

#[async_trait]
impl Synthesizer for EchoSynthesizer {
    fn name(&self) -> &str {
        "echo"
    }

    async fn synthesize(&self, text: &str) -> Result<SpokenAudio, VoiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(SpokenAudio {
            data: text.as_bytes().to_vec(),
            extension: "mp3",
        })
    }
}

/// Counts played clips.
#[derive(Default)]
pub struct CountingSink {
    pub played: Mutex<usize>,
}

#[async_trait]
impl AudioSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    async fn play(&self, _audio: &SpokenAudio) -> Result<(), VoiceError> {
        *self.played.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn clip() -> AudioClip {
    AudioClip::Bytes {
        file_name: "utterance.wav".into(),
        data: vec![0x52, 0x49, 0x46, 0x46],
    }
}
