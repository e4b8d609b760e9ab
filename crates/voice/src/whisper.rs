//! Whisper transcription over the OpenAI audio API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use ridedesk_core::error::VoiceError;
use ridedesk_core::voice::{AudioClip, Transcriber, Transcript};
use serde::Deserialize;
use tracing::{debug, warn};

const SERVICE: &str = "whisper";

/// Speech-to-text via `POST {base}/audio/transcriptions`.
pub struct WhisperTranscriber {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript, VoiceError> {
        let data = clip.read().await?;
        let file_name = clip.file_name();
        debug!(file = %file_name, bytes = data.len(), "Uploading clip for transcription");

        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Request {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Transcription request rejected");
            return Err(VoiceError::Api {
                service: SERVICE.into(),
                status: status.as_u16(),
                message,
            });
        }

        let body: TranscriptionResponse =
            response.json().await.map_err(|e| VoiceError::Request {
                service: SERVICE.into(),
                reason: format!("unreadable response: {e}"),
            })?;

        Ok(Transcript {
            text: body.text.trim().to_string(),
        })
    }
}
