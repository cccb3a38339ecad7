//! Native client for a running tutor server

mod http;
mod pipeline;

pub use http::{ServerCapabilities, TutorClient};
pub use pipeline::{
    Conversation, NO_SPEECH_PLACEHOLDER, Phase, PipelineError, Turn, TurnLog, TutorBackend,
};
