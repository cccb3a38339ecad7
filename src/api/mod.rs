//! HTTP API server for the tutor

pub mod chat;
mod error;
pub mod health;
pub mod ui;
pub mod voice;

pub use error::ApiError;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::Tutor;
use crate::config::{
    ChatConfig, Config, DEFAULT_ELEVENLABS_BASE_URL, DEFAULT_OPENAI_BASE_URL, TtsConfig,
};
use crate::openai::OpenAiClient;
use crate::voice::{SpeechSynthesizer, Transcriber};
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    pub transcriber: Transcriber,
    pub tutor: Tutor,
    pub synthesizer: SpeechSynthesizer,
}

impl ApiState {
    /// Wire every adapter from loaded configuration
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let Config {
            api_keys,
            upstream,
            stt,
            chat,
            tts,
            ..
        } = config;

        let openai = OpenAiClient::from_config(api_keys.openai, &upstream);
        let synthesizer = SpeechSynthesizer::from_config(api_keys.elevenlabs, &upstream, tts);

        Self {
            transcriber: Transcriber::openai(&openai, &stt.models),
            tutor: Tutor::new(openai, chat),
            synthesizer,
        }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    let api = Router::new()
        .merge(voice::router(Arc::clone(&state)))
        .merge(chat::router(state));

    // CORS layer for cross-origin requests from other front-ends
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .merge(health::router())
        .merge(ui::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    port: u16,
    transcriber: Option<Transcriber>,
    tutor: Option<Tutor>,
    synthesizer: Option<SpeechSynthesizer>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            transcriber: None,
            tutor: None,
            synthesizer: None,
        }
    }

    /// Start from loaded configuration
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let port = config.api_server.port;
        let state = ApiState::from_config(config);

        Self::new(port)
            .transcriber(state.transcriber)
            .tutor(state.tutor)
            .synthesizer(state.synthesizer)
    }

    /// Set the listen port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the transcription chain
    #[must_use]
    pub fn transcriber(mut self, transcriber: Transcriber) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Set the dialogue adapter
    #[must_use]
    pub fn tutor(mut self, tutor: Tutor) -> Self {
        self.tutor = Some(tutor);
        self
    }

    /// Set the speech synthesizer
    #[must_use]
    pub fn synthesizer(mut self, synthesizer: SpeechSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Build the API server
    ///
    /// Adapters that were never set are left unconfigured.
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = ApiState {
            transcriber: self.transcriber.unwrap_or_default(),
            tutor: self.tutor.unwrap_or_else(|| {
                Tutor::new(
                    OpenAiClient::new(DEFAULT_OPENAI_BASE_URL, None),
                    ChatConfig::default(),
                )
            }),
            synthesizer: self.synthesizer.unwrap_or_else(|| {
                SpeechSynthesizer::new(DEFAULT_ELEVENLABS_BASE_URL, None, TtsConfig::default())
            }),
        };

        ApiServer {
            state: Arc::new(state),
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            stt = self.state.transcriber.is_configured(),
            chat = self.state.tutor.is_configured(),
            tts = self.state.synthesizer.is_configured(),
            "API server listening"
        );

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
