use thiserror::Error;

use crate::providers::error::ProviderError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Could not open the stream after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: ProviderError,
    },

    #[error("Stream failed after {} bytes of output: {source}", .partial.len())]
    MidStream {
        partial: String,
        #[source]
        source: ProviderError,
    },

    #[error("No content generated")]
    EmptyResponse,

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Relay task failed: {0}")]
    Task(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Text produced before the failure, if any reached the channel.
    #[must_use]
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::MidStream { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
