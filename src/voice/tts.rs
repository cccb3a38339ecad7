//! Text-to-speech (TTS) processing

use secrecy::{ExposeSecret, SecretString};

use crate::config::{TtsConfig, UpstreamConfig};
use crate::error::check_status;
use crate::{Error, Result};

/// Name of the credential reported when it is missing
pub const ELEVENLABS_KEY_VAR: &str = "ELEVENLABS_API_KEY";

/// Content type of synthesized audio
pub const AUDIO_MPEG: &str = "audio/mpeg";

/// Synthesizes speech from text via `ElevenLabs`
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    config: TtsConfig,
}

#[derive(serde::Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

impl SpeechSynthesizer {
    /// Create a synthesizer; a missing key yields an unconfigured instance
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>, config: TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            config,
        }
    }

    /// Create a synthesizer from loaded configuration
    #[must_use]
    pub fn from_config(
        api_key: Option<SecretString>,
        upstream: &UpstreamConfig,
        config: TtsConfig,
    ) -> Self {
        Self::new(upstream.elevenlabs_base_url.clone(), api_key, config)
    }

    /// Whether a synthesis credential is present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Voice used for synthesis
    #[must_use]
    pub fn voice_id(&self) -> &str {
        &self.config.voice_id
    }

    /// Endpoint URL for the configured voice
    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}?optimize_streaming_latency=0&output_format={}",
            self.base_url, self.config.voice_id, self.config.output_format
        )
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` without a key, `Upstream` with the response
    /// body on a non-success status, or `Http` on transport failure
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(Error::NotConfigured(ELEVENLABS_KEY_VAR))?;

        let request = ElevenLabsRequest {
            text,
            model_id: &self.config.model,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        };

        tracing::debug!(
            voice = %self.config.voice_id,
            chars = text.len(),
            "starting speech synthesis"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("accept", AUDIO_MPEG)
            .header("xi-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let audio = check_status(response).await?.bytes().await?;

        tracing::info!(audio_bytes = audio.len(), "speech synthesis complete");
        Ok(audio.to_vec())
    }
}
