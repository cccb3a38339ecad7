//! JSON error envelope shared by the API handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API errors, each mapped to a status and a `{ error, details? }` body
#[derive(Debug)]
pub enum ApiError {
    /// Client sent something unusable (400)
    BadRequest(String),
    /// A credential the endpoint needs is absent (500)
    MissingCredential(&'static str),
    /// An optional capability is switched off (501)
    NotConfigured(&'static str),
    /// Upstream call failed (500), with the upstream body when there is one
    Upstream {
        message: &'static str,
        details: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            Self::MissingCredential(_) | Self::Upstream { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(message) => ErrorBody {
                error: message,
                details: None,
            },
            Self::MissingCredential(var) => ErrorBody {
                error: format!("Missing {var}"),
                details: None,
            },
            Self::NotConfigured(message) => ErrorBody {
                error: message.to_string(),
                details: None,
            },
            Self::Upstream { message, details } => ErrorBody {
                error: message.to_string(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}
