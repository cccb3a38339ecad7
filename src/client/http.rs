//! HTTP client for a running tutor server

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::chat::TutorRequest;
use crate::voice::AudioBlob;
use crate::{Error, Result};

/// Adapter availability reported by the server
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    pub stt_available: bool,
    pub chat_available: bool,
    pub tts_available: bool,
    #[serde(default)]
    pub scenarios: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Deserialize)]
struct TranscribeBody {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatBody {
    #[serde(default)]
    reply: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// Talks to `/api/stt`, `/api/chat` and `/api/tts` on a tutor server
#[derive(Debug, Clone)]
pub struct TutorClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TutorClient {
    /// Create a client for the server at `base_url`
    ///
    /// A path prefix such as `https://host/genie` is kept for every endpoint.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Parse a server URL and create a client
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid server URL {base_url:?}: {e}")))?;
        Ok(Self::new(url))
    }

    /// Server this client talks to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// Fetch adapter availability
    ///
    /// # Errors
    ///
    /// Returns error if the server is unreachable or answers with an error
    pub async fn capabilities(&self) -> Result<ServerCapabilities> {
        let response = self.http.get(self.endpoint("/api/capabilities")?).send().await?;
        Ok(server_error(response).await?.json().await?)
    }

    /// Upload a recording and return its transcript, possibly empty
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails or the server reports an error
    pub async fn transcribe(&self, audio: &AudioBlob) -> Result<String> {
        let part = Part::bytes(audio.bytes.clone())
            .file_name(format!("audio.{}", audio.extension()))
            .mime_str(&audio.mime_type)?;
        let form = Form::new().part("audio", part);

        tracing::debug!(bytes = audio.len(), mime_type = %audio.mime_type, "uploading recording");

        let response = self
            .http
            .post(self.endpoint("/api/stt")?)
            .multipart(form)
            .send()
            .await?;

        let body: TranscribeBody = server_error(response).await?.json().await?;
        Ok(body.text.unwrap_or_default())
    }

    /// Ask the tutor for a reply
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server reports an error
    pub async fn reply(&self, request: &TutorRequest) -> Result<String> {
        let body = json!({
            "message": request.message,
            "scenario": request.scenario.as_deref().unwrap_or_default(),
            "language": request.language.map(|l| l.label()).unwrap_or_default(),
        });

        let response = self
            .http
            .post(self.endpoint("/api/chat")?)
            .json(&body)
            .send()
            .await?;

        let body: ChatBody = server_error(response).await?.json().await?;
        Ok(body.reply.unwrap_or_default())
    }

    /// Synthesize a reply to MP3
    ///
    /// Returns `None` when the server has no synthesis credential.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or synthesis fails upstream
    pub async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .http
            .post(self.endpoint("/api/tts")?)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_IMPLEMENTED {
            tracing::debug!("speech synthesis not configured on server");
            return Ok(None);
        }

        let audio = server_error(response).await?.bytes().await?;
        Ok(Some(audio.to_vec()))
    }
}

/// Turn a server error envelope into an error
async fn server_error(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let body = match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(ErrorBody {
            error,
            details: Some(details),
        }) => format!("{error}: {details}"),
        Ok(ErrorBody { error, .. }) => error,
        Err(_) => raw,
    };

    tracing::warn!(status = %status, error = %body, "tutor server error");
    Err(Error::Upstream {
        status: status.as_u16(),
        body,
    })
}
