//! Tutor chat endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use super::{ApiError, ApiState};
use crate::chat::TutorRequest;
use crate::openai::OPENAI_KEY_VAR;
use crate::prompt::{parse_optional, roleplay_scenario};

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .with_state(state)
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Coerce the `message` field to text; null or missing is empty
fn message_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read an optional string selector, treating non-strings as invalid
fn selector<'a>(body: &'a Value, key: &str) -> Result<Option<&'a str>, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(ApiError::BadRequest(format!("Invalid {key}"))),
    }
}

/// Parse the request body into a tutor turn
fn parse_request(body: &[u8]) -> Result<TutorRequest, ApiError> {
    let body: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
    if !body.is_object() {
        return Err(ApiError::BadRequest("Invalid JSON body".to_string()));
    }

    let scenario = roleplay_scenario(selector(&body, "scenario")?);
    let language = parse_optional(selector(&body, "language")?)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(TutorRequest {
        message: message_text(body.get("message")),
        scenario,
        language,
    })
}

/// Generate a tutor reply for one learner utterance
async fn chat(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    if !state.tutor.is_configured() {
        tracing::error!("/api/chat called without {OPENAI_KEY_VAR}");
        return Err(ApiError::MissingCredential(OPENAI_KEY_VAR));
    }

    let request = parse_request(&body)?;

    let reply = state.tutor.reply(&request).await.map_err(|e| {
        tracing::error!(error = %e, "/api/chat error");
        ApiError::Upstream {
            message: "Failed to generate response",
            details: None,
        }
    })?;

    Ok(Json(ChatResponse { reply }))
}
