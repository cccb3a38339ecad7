//! Turn orchestration: record, transcribe, reply, synthesize
//!
//! A [`Conversation`] moves `Idle -> Recording -> Submitting -> Idle`, or
//! `Idle -> Error -> Idle` when capture fails. Each stage hands a typed
//! result to the next; a failed stage leaves earlier log lines untouched.

use async_trait::async_trait;
use thiserror::Error;

use super::TutorClient;
use crate::chat::TutorRequest;
use crate::prompt::{Language, Scenario};
use crate::voice::{AudioBlob, CaptureError, ClipSlot, PlayableClip, RecordingSession};

/// Logged in place of an empty transcript
pub const NO_SPEECH_PLACEHOLDER: &str = "[no speech detected]";

/// The three remote stages a turn goes through
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// Transcribe a recording; empty text means nothing was recognized
    async fn transcribe(&self, audio: &AudioBlob) -> crate::Result<String>;

    /// Produce the tutor's reply
    async fn reply(&self, request: &TutorRequest) -> crate::Result<String>;

    /// Synthesize a reply, or `None` when synthesis is not configured
    async fn synthesize(&self, text: &str) -> crate::Result<Option<Vec<u8>>>;
}

#[async_trait]
impl TutorBackend for TutorClient {
    async fn transcribe(&self, audio: &AudioBlob) -> crate::Result<String> {
        Self::transcribe(self, audio).await
    }

    async fn reply(&self, request: &TutorRequest) -> crate::Result<String> {
        Self::reply(self, request).await
    }

    async fn synthesize(&self, text: &str) -> crate::Result<Option<Vec<u8>>> {
        Self::synthesize(self, text).await
    }
}

/// Where the conversation is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Submitting,
    /// Capture failed; the message is shown until the next attempt
    Error(CaptureError),
}

/// Why a turn did not complete
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not recording")]
    NotRecording,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("transcription failed: {0}")]
    Transcription(#[source] crate::Error),

    #[error("could not get a reply: {0}")]
    Dialogue(#[source] crate::Error),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] crate::Error),
}

/// Append-only record of what was said
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnLog {
    transcripts: Vec<String>,
    replies: Vec<String>,
}

impl TurnLog {
    /// Record a transcript, substituting the placeholder for empty text
    pub fn push_transcript(&mut self, text: &str) {
        let line = if text.is_empty() {
            NO_SPEECH_PLACEHOLDER
        } else {
            text
        };
        self.transcripts.push(line.to_string());
    }

    /// Record a tutor reply
    pub fn push_reply(&mut self, text: &str) {
        self.replies.push(text.to_string());
    }

    #[must_use]
    pub fn transcripts(&self) -> &[String] {
        &self.transcripts
    }

    #[must_use]
    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    /// "You said" panel text
    #[must_use]
    pub fn transcript_text(&self) -> String {
        self.transcripts.join("\n")
    }

    /// "Genie replied" panel text
    #[must_use]
    pub fn reply_text(&self) -> String {
        self.replies.join("\n")
    }
}

/// Result of one completed turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub transcript: String,
    pub reply: String,
    /// Whether a playable clip was produced
    pub has_audio: bool,
}

/// A learner's session with the tutor
pub struct Conversation<B> {
    backend: B,
    scenario: Option<Scenario>,
    language: Option<Language>,
    phase: Phase,
    loading: bool,
    session: Option<RecordingSession>,
    log: TurnLog,
    clips: ClipSlot,
}

impl<B: TutorBackend> Conversation<B> {
    /// Start an idle conversation
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            scenario: None,
            language: None,
            phase: Phase::Idle,
            loading: false,
            session: None,
            log: TurnLog::default(),
            clips: ClipSlot::new(),
        }
    }

    /// Choose the roleplay scenario, `None` for off
    pub const fn set_scenario(&mut self, scenario: Option<Scenario>) {
        self.scenario = scenario;
    }

    /// Choose the reply language, `None` for the model default
    pub const fn set_language(&mut self, language: Option<Language>) {
        self.language = language;
    }

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether a submission is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn log(&self) -> &TurnLog {
        &self.log
    }

    /// The live reply clip, if any
    #[must_use]
    pub const fn clip(&self) -> Option<&PlayableClip> {
        self.clips.current()
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Open a recording session
    ///
    /// Returns `false` while recording or submitting. A previous capture
    /// error is cleared.
    pub fn start_recording<F>(
        &mut self,
        device_id: Option<String>,
        is_supported: F,
        platform_default: &str,
    ) -> bool
    where
        F: Fn(&str) -> bool,
    {
        if matches!(self.phase, Phase::Recording | Phase::Submitting) {
            return false;
        }

        self.session = Some(RecordingSession::start(device_id, is_supported, platform_default));
        self.phase = Phase::Recording;
        true
    }

    /// Capture could not start; show the error and stay out of recording
    pub fn capture_failed(&mut self, error: CaptureError) {
        tracing::warn!(kind = error.kind(), error = %error, "capture failed");
        self.session = None;
        self.phase = Phase::Error(error);
    }

    /// Return from an error to idle
    pub fn dismiss_error(&mut self) {
        if matches!(self.phase, Phase::Error(_)) {
            self.phase = Phase::Idle;
        }
    }

    /// Feed recorded data into the open session
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if let Some(session) = self.session.as_mut() {
            session.push_chunk(chunk);
        }
    }

    /// Stop recording and run the turn through every stage
    ///
    /// # Errors
    ///
    /// Returns the first failing stage. Log entries made by earlier stages
    /// are kept.
    pub async fn stop_and_submit(&mut self) -> Result<Turn, PipelineError> {
        let session = self.session.take().ok_or(PipelineError::NotRecording)?;
        let audio = match session.finish().ensure_speech() {
            Ok(audio) => audio,
            Err(e) => {
                self.capture_failed(e.clone());
                return Err(e.into());
            }
        };

        self.phase = Phase::Submitting;
        self.loading = true;
        let result = self.run_stages(&audio).await;
        self.loading = false;
        self.phase = Phase::Idle;

        if let Err(e) = &result {
            tracing::error!(error = %e, "turn failed");
        }
        result
    }

    async fn run_stages(&mut self, audio: &AudioBlob) -> Result<Turn, PipelineError> {
        let transcript = self
            .backend
            .transcribe(audio)
            .await
            .map_err(PipelineError::Transcription)?;
        self.log.push_transcript(&transcript);

        let request = TutorRequest {
            message: transcript.clone(),
            scenario: self.scenario.map(|s| s.label().to_string()),
            language: self.language,
        };
        let reply = self
            .backend
            .reply(&request)
            .await
            .map_err(PipelineError::Dialogue)?;
        self.log.push_reply(&reply);

        let has_audio = match self
            .backend
            .synthesize(&reply)
            .await
            .map_err(PipelineError::Synthesis)?
        {
            Some(mp3) => {
                self.clips.store(&mp3).map_err(PipelineError::Synthesis)?;
                true
            }
            None => false,
        };

        Ok(Turn {
            transcript,
            reply,
            has_audio,
        })
    }
}
