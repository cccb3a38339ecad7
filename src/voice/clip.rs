//! Playable audio clips backed by temporary files
//!
//! At most one clip is live per slot. Storing a new clip releases the
//! previous one, and dropping the slot releases the last.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::Result;

/// A synthesized reply written to disk for playback
#[derive(Debug)]
pub struct PlayableClip {
    file: NamedTempFile,
    len: usize,
}

impl PlayableClip {
    /// Location of the clip on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Size of the clip in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the clip holds no audio
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Holder for the single live clip
#[derive(Debug, Default)]
pub struct ClipSlot {
    current: Option<PlayableClip>,
}

impl ClipSlot {
    /// Create an empty slot
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Write MP3 bytes into a fresh clip, releasing the previous one
    ///
    /// # Errors
    ///
    /// Returns error if the temporary file cannot be written
    pub fn store(&mut self, mp3: &[u8]) -> Result<&PlayableClip> {
        let mut file = tempfile::Builder::new()
            .prefix("genie-reply-")
            .suffix(".mp3")
            .tempfile()?;
        file.write_all(mp3)?;
        file.flush()?;

        if let Some(previous) = self.current.take() {
            tracing::debug!(path = %previous.path().display(), "releasing previous clip");
        }

        let clip = self.current.insert(PlayableClip {
            file,
            len: mp3.len(),
        });
        tracing::debug!(path = %clip.path().display(), bytes = clip.len, "stored playable clip");
        Ok(clip)
    }

    /// The live clip, if any
    #[must_use]
    pub const fn current(&self) -> Option<&PlayableClip> {
        self.current.as_ref()
    }

    /// Release the live clip
    pub fn release(&mut self) {
        self.current = None;
    }
}
