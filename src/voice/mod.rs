//! Voice processing module
//!
//! Speech adapters (STT, TTS) used by the server, plus the client-side
//! recording, clip and audio device plumbing used by `genie talk`.

mod capture;
mod clip;
mod playback;
mod recording;
pub mod stt;
pub mod tts;

pub use capture::{
    AudioCapture, NATIVE_CONTAINER, SAMPLE_RATE, input_device_names, rms, samples_to_wav,
};
pub use clip::{ClipSlot, PlayableClip};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use recording::{
    AudioBlob, CaptureError, MIN_SPEECH_BYTES, PREFERRED_CONTAINERS, RecordingSession,
    choose_container, ensure_secure_origin,
};
pub use stt::{AudioUpload, OpenAiTranscription, Transcriber, TranscriptionProvider};
pub use tts::SpeechSynthesizer;
