//! Genie - a voice English tutor for kids
//!
//! The server side wraps three upstream services behind small JSON/multipart
//! endpoints:
//! - `POST /api/stt`: speech-to-text with an ordered model fallback chain
//! - `POST /api/chat`: single-turn kid-friendly replies, optional roleplay and language
//! - `POST /api/tts`: speech synthesis to MP3
//!
//! The client side (`genie talk` and the embedded browser page) records an
//! utterance and drives it through those endpoints one stage at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Clients                          │
//! │        Browser page (/)    │    genie talk           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Genie server                        │
//! │     /api/stt    │    /api/chat    │    /api/tts      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Upstreams                          │
//! │   OpenAI transcription │ OpenAI chat │ ElevenLabs    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
