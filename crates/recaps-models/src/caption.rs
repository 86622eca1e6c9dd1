//! Caption chunk definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A short on-screen caption (1-3 words) with its display window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionChunk {
    /// Uppercased, space-joined words
    pub text: String,
    /// Display start in seconds
    pub start_time: f64,
    /// Display end in seconds
    pub end_time: f64,
}

impl CaptionChunk {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    /// On-screen duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Number of words in the caption text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// How the captions for a render were timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionMode {
    /// Word timestamps supplied with the job (TTS alignment)
    Precise,
    /// Word timestamps obtained by transcribing the voice track
    Transcribed,
    /// Uniform speaking-rate estimate from the script
    Estimated,
}

impl CaptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionMode::Precise => "precise",
            CaptionMode::Transcribed => "transcribed",
            CaptionMode::Estimated => "estimated",
        }
    }
}

impl fmt::Display for CaptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
