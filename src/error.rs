//! Error types for the Genie tutor gateway

use thiserror::Error;

/// Result type alias for Genie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Genie tutor gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Microphone capture error, classified for display
    #[error("capture error: {0}")]
    Capture(#[from] crate::voice::CaptureError),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Chat completion error
    #[error("chat error: {0}")]
    Chat(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Upstream service answered with a non-success status
    #[error("upstream error {status}: {body}")]
    Upstream {
        /// HTTP status returned by the upstream service
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// A required credential is not configured
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Turn a non-success upstream response into an error carrying its body
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::error!(status = %status, body = %body, "upstream API error");
    Err(Error::Upstream {
        status: status.as_u16(),
        body,
    })
}
