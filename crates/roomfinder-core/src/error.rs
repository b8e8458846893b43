use thiserror::Error;

/// Top-level error type for the Roomfinder service.
///
/// Subsystem crates define their own error types and convert into this one
/// at the composition root so that `?` works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoomfinderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("History error: {0}")]
    History(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for RoomfinderError {
    fn from(err: toml::de::Error) -> Self {
        RoomfinderError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RoomfinderError {
    fn from(err: toml::ser::Error) -> Self {
        RoomfinderError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RoomfinderError {
    fn from(err: serde_json::Error) -> Self {
        RoomfinderError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Roomfinder operations.
pub type Result<T> = std::result::Result<T, RoomfinderError>;
