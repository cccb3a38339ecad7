//! Recording sessions: chunk accumulation, container choice and capture errors

use thiserror::Error;
use url::Url;

/// Recordings smaller than this are treated as "no speech captured"
pub const MIN_SPEECH_BYTES: usize = 5 * 1024;

/// Container formats in order of preference
pub const PREFERRED_CONTAINERS: [&str; 4] = [
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
    "audio/mp4",
];

/// Pick the first preferred container the recorder supports
///
/// `None` means the recorder should use its platform default.
pub fn choose_container<F>(is_supported: F) -> Option<&'static str>
where
    F: Fn(&str) -> bool,
{
    PREFERRED_CONTAINERS.into_iter().find(|&mime| is_supported(mime))
}

/// Why capture could not produce audio, with a message fit for the learner
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone permission was denied. Please allow microphone access and try again.")]
    PermissionDenied,

    #[error("No microphone was found. Please connect a microphone and try again.")]
    NoDevice,

    #[error("Microphone access needs a secure connection (HTTPS or localhost).")]
    InsecureContext,

    #[error("No speech captured. Please speak a little longer and try again.")]
    NoSpeech,

    #[error("Could not access the microphone: {0}")]
    Failed(String),
}

impl CaptureError {
    /// Classify a browser `DOMException` name
    #[must_use]
    pub fn from_error_name(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => Self::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => Self::NoDevice,
            "SecurityError" => Self::InsecureContext,
            _ => Self::Failed(message.to_string()),
        }
    }

    /// Classify a native audio backend failure by its message
    #[must_use]
    pub fn from_backend_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("permission")
            || lower.contains("access denied")
            || lower.contains("not authorized")
        {
            Self::PermissionDenied
        } else if lower.contains("no such device")
            || lower.contains("device not available")
            || lower.contains("no longer available")
            || lower.contains("no input device")
        {
            Self::NoDevice
        } else {
            Self::Failed(message.to_string())
        }
    }

    /// Short machine-readable category
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission",
            Self::NoDevice => "device-missing",
            Self::InsecureContext => "insecure-context",
            Self::NoSpeech => "no-speech",
            Self::Failed(_) => "generic",
        }
    }
}

/// Refuse to capture unless audio travels over HTTPS or stays on this machine
///
/// # Errors
///
/// Returns `InsecureContext` for plain-text remote origins
pub fn ensure_secure_origin(origin: &Url) -> Result<(), CaptureError> {
    if origin.scheme() == "https" {
        return Ok(());
    }

    let loopback = match origin.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };

    if loopback {
        Ok(())
    } else {
        Err(CaptureError::InsecureContext)
    }
}

/// A finished recording tagged with its container type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioBlob {
    /// Size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the blob is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension matching the container type
    #[must_use]
    pub fn extension(&self) -> &'static str {
        let base = self.mime_type.split(';').next().unwrap_or_default().trim();
        match base {
            "audio/ogg" => "ogg",
            "audio/mp4" => "mp4",
            "audio/wav" | "audio/x-wav" => "wav",
            _ => "webm",
        }
    }

    /// Reject recordings too small to contain speech
    ///
    /// # Errors
    ///
    /// Returns `NoSpeech` below [`MIN_SPEECH_BYTES`]
    pub fn ensure_speech(self) -> Result<Self, CaptureError> {
        if self.len() < MIN_SPEECH_BYTES {
            tracing::debug!(bytes = self.len(), "recording below speech threshold");
            return Err(CaptureError::NoSpeech);
        }
        Ok(self)
    }
}

/// An in-progress recording
#[derive(Debug)]
pub struct RecordingSession {
    device_id: Option<String>,
    mime_type: String,
    chunks: Vec<Vec<u8>>,
}

impl RecordingSession {
    /// Begin a session, preferring the recorder's best supported container
    #[must_use]
    pub fn start<F>(device_id: Option<String>, is_supported: F, platform_default: &str) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mime_type = choose_container(is_supported).unwrap_or(platform_default).to_string();
        tracing::debug!(device = ?device_id, mime_type = %mime_type, "recording session started");

        Self {
            device_id,
            mime_type,
            chunks: Vec::new(),
        }
    }

    /// Append a data chunk; empty chunks are ignored
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Selected input device, if one was picked
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Container type the session records into
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Number of non-empty chunks collected
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenate chunks into one blob
    #[must_use]
    pub fn finish(self) -> AudioBlob {
        AudioBlob {
            bytes: self.chunks.concat(),
            mime_type: self.mime_type,
        }
    }
}
