//! Voice API endpoints for speech-to-text and text-to-speech

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::openai::OPENAI_KEY_VAR;
use crate::prompt::{Language, Scenario};
use crate::voice::AudioUpload;
use crate::voice::tts::AUDIO_MPEG;
use crate::Error;

/// Largest upload accepted by the transcription API
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/stt",
            post(transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/tts", post(synthesize))
        .route("/capabilities", get(capabilities))
        .with_state(state)
}

/// Capabilities and selector values for clients
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub stt_available: bool,
    pub chat_available: bool,
    pub tts_available: bool,
    pub scenarios: Vec<&'static str>,
    pub languages: Vec<&'static str>,
}

/// Report which adapters are configured
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<Capabilities> {
    Json(Capabilities {
        stt_available: state.transcriber.is_configured(),
        chat_available: state.tutor.is_configured(),
        tts_available: state.synthesizer.is_configured(),
        scenarios: Scenario::ALL.iter().map(|s| s.label()).collect(),
        languages: Language::ALL.iter().map(|l| l.label()).collect(),
    })
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

/// Pull the `audio` file part out of a multipart form
async fn read_audio_field(mut multipart: Multipart) -> Result<Option<AudioUpload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {e}")))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        // Plain text fields are not audio
        if field.file_name().is_none() && field.content_type().is_none() {
            return Ok(None);
        }

        let mime_type = field.content_type().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {e}")))?;

        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(AudioUpload::new(bytes.to_vec(), mime_type.as_deref())));
    }

    Ok(None)
}

/// Transcribe uploaded audio to text
///
/// Accepts a multipart form whose `audio` field is the recording.
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    if !state.transcriber.is_configured() {
        tracing::error!("/api/stt called without {OPENAI_KEY_VAR}");
        return Err(ApiError::MissingCredential(OPENAI_KEY_VAR));
    }

    let no_audio = || ApiError::BadRequest("No audio uploaded".to_string());
    let multipart = multipart.map_err(|e| {
        tracing::warn!(error = %e, "rejected transcription upload");
        no_audio()
    })?;
    let upload = read_audio_field(multipart).await?.ok_or_else(no_audio)?;

    let text = state.transcriber.transcribe(&upload).await.map_err(|e| {
        tracing::error!(error = %e, "/api/stt error");
        ApiError::Upstream {
            message: "Failed to transcribe audio",
            details: None,
        }
    })?;

    Ok(Json(TranscribeResponse { text }))
}

/// Synthesize text to speech
///
/// Returns audio in MP3 format
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let missing_text = || ApiError::BadRequest("Missing text".to_string());

    let request: serde_json::Value = serde_json::from_slice(&body).map_err(|_| missing_text())?;
    let text = request
        .get("text")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(missing_text)?;

    if !state.synthesizer.is_configured() {
        return Err(ApiError::NotConfigured("TTS not configured"));
    }

    let audio = state.synthesizer.synthesize(text).await.map_err(|e| {
        tracing::error!(error = %e, "/api/tts error");
        match e {
            Error::Upstream { body, .. } => ApiError::Upstream {
                message: "TTS request failed",
                details: Some(body),
            },
            _ => ApiError::Upstream {
                message: "Failed to synthesize speech",
                details: None,
            },
        }
    })?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, AUDIO_MPEG)], audio).into_response())
}
