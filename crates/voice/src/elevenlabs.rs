//! ElevenLabs text-to-speech.

use async_trait::async_trait;
use ridedesk_core::error::VoiceError;
use ridedesk_core::voice::{SpokenAudio, Synthesizer};
use serde::Serialize;
use tracing::{debug, warn};

const SERVICE: &str = "elevenlabs";

/// Synthesizes speech via `POST {base}/text-to-speech/{voice_id}`; returns mp3.
pub struct ElevenLabsSynthesizer {
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn synthesize(&self, text: &str) -> Result<SpokenAudio, VoiceError> {
        debug!(voice = %self.voice_id, characters = text.len(), "Synthesizing reply");

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&SynthesisBody {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await
            .map_err(|e| VoiceError::Request {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Synthesis request rejected");
            return Err(VoiceError::Api {
                service: SERVICE.into(),
                status: status.as_u16(),
                message,
            });
        }

        let data = response.bytes().await.map_err(|e| VoiceError::Request {
            service: SERVICE.into(),
            reason: e.to_string(),
        })?;

        if data.is_empty() {
            return Err(VoiceError::InvalidAudio("synthesis returned no audio".into()));
        }

        Ok(SpokenAudio {
            data: data.to_vec(),
            extension: "mp3",
        })
    }
}
