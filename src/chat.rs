//! Dialogue adapter: one single-turn chat completion per learner utterance

use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::check_status;
use crate::openai::OpenAiClient;
use crate::prompt::{Language, build_system_prompt};
use crate::Result;

/// Reply used when the model returns no content
pub const FALLBACK_REPLY: &str = "I'm here! What would you like to learn today?";

/// One tutor turn request
#[derive(Debug, Clone, Default)]
pub struct TutorRequest {
    pub message: String,
    /// Roleplay text for the prompt, a scenario label or free text
    pub scenario: Option<String>,
    pub language: Option<Language>,
}

/// Chat-completion client wearing the tutor persona
pub struct Tutor {
    client: OpenAiClient,
    config: ChatConfig,
}

impl Tutor {
    /// Create a tutor over an `OpenAI` client
    #[must_use]
    pub const fn new(client: OpenAiClient, config: ChatConfig) -> Self {
        Self { client, config }
    }

    /// Whether a chat credential is present
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Assemble the upstream request body
    fn completion_request(&self, request: &TutorRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: build_system_prompt(request.scenario.as_deref(), request.language),
                },
                Message {
                    role: "user",
                    content: request.message.clone(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    /// Generate a reply
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` without a key, or the upstream/transport error
    pub async fn reply(&self, request: &TutorRequest) -> Result<String> {
        let body = self.completion_request(request);

        tracing::debug!(
            model = %body.model,
            scenario = ?request.scenario,
            language = ?request.language,
            "requesting chat completion"
        );

        let response = self
            .client
            .post("/v1/chat/completions")?
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                e
            })?;

        let completion: ChatCompletionResponse = check_status(response).await?.json().await?;
        Ok(extract_reply(completion))
    }
}

/// Take the first choice's trimmed text, falling back when it is absent or blank
fn extract_reply(completion: ChatCompletionResponse) -> String {
    completion
        .choices
        .into_iter()
        .flatten()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
