//! Speech-to-text collaborators used for voice messages.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use roomfinder_core::config::VoiceConfig;

use crate::error::TranscriptionError;

/// Converts a voice clip into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe raw audio bytes as received from the chat surface.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError>;
}

/// Transcriber used when voice input is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscriptionError> {
        Err(TranscriptionError::Unavailable(
            "voice input is disabled".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptBody {
    #[serde(default)]
    text: String,
}

/// Transcriber backed by an HTTP speech service.
///
/// The clip is POSTed as the request body; the service answers
/// `{"text": "..."}` on success and 422 when it heard nothing usable.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl HttpTranscriber {
    pub fn new(config: &VoiceConfig, timeout_secs: u64) -> Result<Self, TranscriptionError> {
        if config.endpoint.trim().is_empty() {
            return Err(TranscriptionError::Unavailable(
                "voice endpoint is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TranscriptionError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::NotUnderstood);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("lang", self.language.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Speech service request failed");
                TranscriptionError::Unavailable(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = if status == 200 {
            Some(
                response
                    .json::<TranscriptBody>()
                    .await
                    .map_err(|e| TranscriptionError::Unavailable(e.to_string()))?,
            )
        } else {
            None
        };
        interpret(status, body)
    }
}

/// Map a speech service reply onto the transcription outcome.
fn interpret(status: u16, body: Option<TranscriptBody>) -> Result<String, TranscriptionError> {
    match (status, body) {
        (200, Some(body)) => {
            let text = body.text.trim();
            if text.is_empty() {
                Err(TranscriptionError::NotUnderstood)
            } else {
                Ok(text.to_string())
            }
        }
        (422, _) => Err(TranscriptionError::NotUnderstood),
        (status, _) => {
            tracing::warn!(status, "Speech service returned an error");
            Err(TranscriptionError::Unavailable(format!(
                "speech service returned status {}",
                status
            )))
        }
    }
}
