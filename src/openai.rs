//! Shared `OpenAI` HTTP client used by transcription and chat

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::config::UpstreamConfig;
use crate::{Error, Result};

/// Name of the credential reported when it is missing
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// Connection settings for the `OpenAI` REST API
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<Arc<SecretString>>,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client for the given origin
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.map(Arc::new),
        }
    }

    /// Create a client from loaded configuration
    #[must_use]
    pub fn from_config(api_key: Option<SecretString>, upstream: &UpstreamConfig) -> Self {
        Self::new(upstream.openai_base_url.clone(), api_key)
    }

    /// Whether a credential is present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build a full endpoint URL
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start an authorized POST request
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if no API key is present
    pub fn post(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let key = self
            .api_key
            .as_ref()
            .ok_or(Error::NotConfigured(OPENAI_KEY_VAR))?;

        Ok(self
            .http
            .post(self.url(path))
            .bearer_auth(key.expose_secret()))
    }
}
