//! Speech collaborators for RideDesk.
//!
//! - [`WhisperTranscriber`]: passenger audio → text
//! - [`ElevenLabsSynthesizer`]: agent reply → mp3
//! - [`FileSink`] / [`CommandSink`]: where the mp3 goes

pub mod elevenlabs;
pub mod playback;
pub mod whisper;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use playback::{CommandSink, FileSink};
pub use whisper::WhisperTranscriber;

use ridedesk_config::{AppConfig, ConfigError};
use ridedesk_core::voice::{AudioSink, NullSink};
use std::sync::Arc;

/// Build the transcriber from configuration. Requires the OpenAI key.
pub fn transcriber_from_config(config: &AppConfig) -> Result<WhisperTranscriber, ConfigError> {
    let api_key = config.require_openai_key()?;
    Ok(WhisperTranscriber::new(
        config.openai_api_url.clone(),
        api_key,
        config.voice.stt_model.clone(),
    ))
}

/// Build the synthesizer from configuration. Requires the ElevenLabs key.
pub fn synthesizer_from_config(
    config: &AppConfig,
) -> Result<ElevenLabsSynthesizer, ConfigError> {
    let api_key = config.require_elevenlabs_key()?;
    Ok(ElevenLabsSynthesizer::new(
        config.voice.elevenlabs_api_url.clone(),
        api_key,
        config.voice.voice_id.clone(),
        config.voice.tts_model.clone(),
    ))
}

/// Pick the audio sink: a directory of files, or the external player.
pub fn sink_from_config(config: &AppConfig) -> Arc<dyn AudioSink> {
    if let Some(dir) = &config.voice.output_dir {
        return Arc::new(FileSink::new(dir.clone()));
    }
    match CommandSink::new(&config.voice.player) {
        Some(sink) => Arc::new(sink),
        None => Arc::new(NullSink),
    }
}
