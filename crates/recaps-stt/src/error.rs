//! Error types for speech-to-text.

use thiserror::Error;

/// Result type for STT operations.
pub type SttResult<T> = Result<T, SttError>;

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum SttError {
    #[error("STT configuration error: {0}")]
    Config(String),

    #[error("STT request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Transcription returned no results")]
    NoResults,

    #[error("Invalid STT response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedAudio(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SttError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SttError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            SttError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
