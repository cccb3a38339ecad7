//! Configuration management for the Genie tutor gateway
//!
//! Environment is read once here; adapters receive their settings explicitly.

use secrecy::SecretString;

use crate::{Error, Result};

/// Default `OpenAI` API origin
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default `ElevenLabs` API origin
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Built-in `ElevenLabs` voice ("Rachel")
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Genie gateway configuration
#[derive(Debug, Default)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Upstream service origins
    pub upstream: UpstreamConfig,

    /// Transcription configuration
    pub stt: SttConfig,

    /// Chat completion configuration
    pub chat: ChatConfig,

    /// Speech synthesis configuration
    pub tts: TtsConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (transcription and chat)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (speech synthesis)
    pub elevenlabs: Option<SecretString>,
}

/// Upstream service origins, overridable for self-hosted proxies and tests
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub openai_base_url: String,
    pub elevenlabs_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            elevenlabs_base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
        }
    }
}

/// Transcription configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Models tried in order; the first success wins
    pub models: Vec<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            models: vec!["gpt-4o-mini-transcribe".to_string(), "whisper-1".to_string()],
        }
    }
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.6,
            max_tokens: 180,
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// `ElevenLabs` voice identifier
    pub voice_id: String,

    /// `ElevenLabs` model identifier
    pub model: String,

    /// Voice stability (0.0 to 1.0)
    pub stability: f32,

    /// Similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,

    /// Output format requested from the synthesis API
    pub output_format: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model: "eleven_multilingual_v2".to_string(),
            stability: 0.4,
            similarity_boost: 0.8,
            output_format: "mp3_44100_128".to_string(),
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            openai: var("OPENAI_API_KEY").map(SecretString::from),
            elevenlabs: var("ELEVENLABS_API_KEY").map(SecretString::from),
        };

        let defaults = UpstreamConfig::default();
        let upstream = UpstreamConfig {
            openai_base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            elevenlabs_base_url: var("ELEVENLABS_BASE_URL")
                .unwrap_or(defaults.elevenlabs_base_url),
        };

        let mut chat = ChatConfig::default();
        if let Some(model) = var("GENIE_CHAT_MODEL") {
            chat.model = model;
        }

        let mut tts = TtsConfig::default();
        if let Some(voice_id) = var("ELEVENLABS_VOICE_ID") {
            tts.voice_id = voice_id;
        }

        let port = match var("GENIE_PORT").or_else(|| var("PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid port {raw:?}: {e}")))?,
            None => DEFAULT_PORT,
        };

        if api_keys.openai.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, transcription and chat will report missing credentials");
        }
        if api_keys.elevenlabs.is_none() {
            tracing::info!("ELEVENLABS_API_KEY not set, speech synthesis disabled");
        }

        Ok(Self {
            api_keys,
            upstream,
            stt: SttConfig::default(),
            chat,
            tts,
            api_server: ApiServerConfig { port },
        })
    }
}
