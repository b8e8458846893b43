//! Voice input for the conversational engine.
//!
//! Voice messages are transcribed before they reach the state machine, so
//! every step treats a recognised voice message exactly like typed text.

use roomfinder_provider::{Transcriber, TranscriptionError};

use crate::event::{Inbound, UserInput};

/// Resolves inbound events into state machine input.
pub struct VoiceInterface<'a> {
    transcriber: &'a dyn Transcriber,
}

impl<'a> VoiceInterface<'a> {
    pub fn new(transcriber: &'a dyn Transcriber) -> Self {
        Self { transcriber }
    }

    /// Turn an inbound event into [`UserInput`], transcribing voice.
    ///
    /// A failed transcription becomes its own input variant instead of an
    /// error, so the conversation keeps its step.
    pub async fn resolve(&self, inbound: Inbound) -> UserInput {
        match inbound {
            Inbound::Text(text) => UserInput::Text(text),
            Inbound::Callback(action) => UserInput::Callback(action),
            Inbound::Voice(audio) => match self.transcriber.transcribe(&audio).await {
                Ok(text) => {
                    tracing::debug!(bytes = audio.len(), text = %text, "Voice message transcribed");
                    UserInput::Text(text)
                }
                Err(TranscriptionError::NotUnderstood) => {
                    tracing::info!(bytes = audio.len(), "Voice message not understood");
                    UserInput::NotUnderstood
                }
                Err(TranscriptionError::Unavailable(reason)) => {
                    tracing::warn!(reason = %reason, "Transcription service unavailable");
                    UserInput::TranscriptionUnavailable
                }
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
