//! Word-level timing data.

use serde::{Deserialize, Serialize};

/// A single spoken word with its start/end time in seconds.
///
/// Produced by TTS alignment data or a speech-to-text transcription. The
/// word text is kept verbatim, punctuation included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTimestamp {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl WordTimestamp {
    pub fn new(word: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            word: word.into(),
            start_time,
            end_time,
        }
    }

    /// Spoken duration in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}
