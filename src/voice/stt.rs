//! Speech-to-text (STT) processing

use async_trait::async_trait;

use crate::error::check_status;
use crate::openai::{OPENAI_KEY_VAR, OpenAiClient};
use crate::{Error, Result};

/// MIME type assumed when an upload does not declare one
pub const DEFAULT_UPLOAD_MIME: &str = "audio/webm";

/// File name reported to the transcription API
pub const UPLOAD_FILE_NAME: &str = "audio.webm";

/// Audio handed to a transcription provider
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AudioUpload {
    /// Wrap uploaded bytes, defaulting the MIME type when it is missing
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: Option<&str>) -> Self {
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_MIME)
            .to_string();

        Self { bytes, mime_type }
    }
}

/// Trait for transcription backends
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe audio, returning an empty string if nothing was recognized
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String>;

    /// Whether the provider has the credentials it needs
    fn is_configured(&self) -> bool;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Response from the `OpenAI` transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// `OpenAI` transcription with a fixed model
pub struct OpenAiTranscription {
    client: OpenAiClient,
    model: String,
}

impl OpenAiTranscription {
    /// Create a provider bound to a model
    #[must_use]
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiTranscription {
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            audio_bytes = audio.bytes.len(),
            mime_type = %audio.mime_type,
            "starting transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.bytes.clone())
                    .file_name(UPLOAD_FILE_NAME)
                    .mime_str(&audio.mime_type)
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post("/v1/audio/transcriptions")?
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model = %self.model, "transcription request failed");
                e
            })?;

        let result: TranscriptionResponse = check_status(response).await?.json().await?;
        let text = result.text.unwrap_or_default();

        tracing::info!(model = %self.model, transcript = %text, "transcription complete");
        Ok(text)
    }

    fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Transcribes speech through an ordered provider chain
///
/// Providers are tried in order and the first success wins. There is no
/// backoff: each provider gets exactly one attempt.
pub struct Transcriber {
    providers: Vec<Box<dyn TranscriptionProvider>>,
}

impl Transcriber {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Build the `OpenAI` chain: one provider per model, in order
    #[must_use]
    pub fn openai(client: &OpenAiClient, models: &[String]) -> Self {
        let mut transcriber = Self::new();
        for model in models {
            transcriber.add_provider(Box::new(OpenAiTranscription::new(client.clone(), model)));
        }
        transcriber
    }

    /// Append a provider to the chain
    pub fn add_provider(&mut self, provider: Box<dyn TranscriptionProvider>) {
        self.providers.push(provider);
    }

    /// Whether any provider in the chain can run
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.providers.iter().any(|p| p.is_configured())
    }

    /// Transcribe audio to text
    ///
    /// # Errors
    ///
    /// Returns the last provider's error if every provider fails, or
    /// `NotConfigured` if none can run
    pub async fn transcribe(&self, audio: &AudioUpload) -> Result<String> {
        let mut last_error = Error::NotConfigured(OPENAI_KEY_VAR);

        for provider in self.providers.iter().filter(|p| p.is_configured()) {
            match provider.transcribe(audio).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %e,
                        "transcription provider failed, trying next"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

impl Default for Transcriber {
    fn default() -> Self {
        Self::new()
    }
}
