//! Error types for the provider collaborators.

use roomfinder_core::error::RoomfinderError;

/// Errors from the hotel search provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider API key is not configured")]
    MissingApiKey,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

impl From<ProviderError> for RoomfinderError {
    fn from(err: ProviderError) -> Self {
        RoomfinderError::Provider(err.to_string())
    }
}

/// Errors from speech-to-text.
///
/// The two variants produce different replies to the user, so they must
/// stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptionError {
    #[error("speech could not be understood")]
    NotUnderstood,
    #[error("speech service unavailable: {0}")]
    Unavailable(String),
}

impl From<TranscriptionError> for RoomfinderError {
    fn from(err: TranscriptionError) -> Self {
        RoomfinderError::Transcription(err.to_string())
    }
}
