//! Error types for the conversation engine.

use roomfinder_core::error::RoomfinderError;
use roomfinder_history::HistoryError;
use roomfinder_provider::ProviderError;

use crate::step::Step;

/// Errors from the chat engine.
///
/// Validation problems never show up here; they are answered in place by
/// re-prompting. These are the failures that abort a step.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid step transition from {0} to {1}")]
    InvalidTransition(Step, Step),
    #[error("conversation step panicked: {0}")]
    StepPanicked(String),
    #[error("step was cancelled")]
    Cancelled,
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

impl From<ChatError> for RoomfinderError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Provider(e) => e.into(),
            ChatError::History(e) => e.into(),
            other => RoomfinderError::Api(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::InvalidTransition(Step::Idle, Step::Searching).to_string(),
            "invalid step transition from idle to searching"
        );
        assert_eq!(ChatError::Cancelled.to_string(), "step was cancelled");
        assert_eq!(
            ChatError::StepPanicked("boom".into()).to_string(),
            "conversation step panicked: boom"
        );
    }

    #[test]
    fn test_from_provider_error() {
        let err: ChatError = ProviderError::Status(503).into();
        assert!(matches!(err, ChatError::Provider(ProviderError::Status(503))));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_into_roomfinder_error() {
        let err: RoomfinderError = ChatError::Provider(ProviderError::MissingApiKey).into();
        assert!(matches!(err, RoomfinderError::Provider(_)));

        let err: RoomfinderError = ChatError::Cancelled.into();
        assert!(matches!(err, RoomfinderError::Api(_)));
    }
}
