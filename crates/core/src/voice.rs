//! Speech collaborator traits: transcription in, synthesis and playback out.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::VoiceError;

/// A captured audio clip.
#[derive(Debug, Clone)]
pub enum AudioClip {
    /// A recording on disk (what the capture front end produces)
    File(PathBuf),
    /// Raw encoded bytes with a file name hint for the provider
    Bytes { file_name: String, data: Vec<u8> },
}

impl AudioClip {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// File name used when uploading the clip.
    pub fn file_name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio.wav".into()),
            Self::Bytes { file_name, .. } => file_name.clone(),
        }
    }

    /// Read the encoded audio. Empty clips are rejected.
    pub async fn read(&self) -> Result<Vec<u8>, VoiceError> {
        let data = match self {
            Self::File(path) => tokio::fs::read(path).await?,
            Self::Bytes { data, .. } => data.clone(),
        };
        if data.is_empty() {
            return Err(VoiceError::InvalidAudio(format!(
                "{} contains no audio",
                self.file_name()
            )));
        }
        Ok(data)
    }
}

/// Result of a transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
}

/// Speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, VoiceError>;
}

/// Synthesized speech, ready to play.
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    /// Encoded bytes (mp3 for ElevenLabs)
    pub data: Vec<u8>,
    /// File extension matching the encoding
    pub extension: &'static str,
}

/// Text-to-speech collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, text: &str) -> Result<SpokenAudio, VoiceError>;
}

/// Where synthesized speech ends up.
#[async_trait]
pub trait AudioSink: Send + Sync {
    fn name(&self) -> &str;

    async fn play(&self, audio: &SpokenAudio) -> Result<(), VoiceError>;
}

/// A sink that discards audio (`--mute`, tests).
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    async fn play(&self, _audio: &SpokenAudio) -> Result<(), VoiceError> {
        Ok(())
    }
}

/// Whether a path looks like an audio file the transcriber accepts.
pub fn is_supported_audio(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("wav" | "mp3" | "m4a" | "mp4" | "mpeg" | "mpga" | "webm" | "ogg" | "flac")
    )
}
