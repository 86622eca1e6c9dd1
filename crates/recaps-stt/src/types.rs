//! Google Speech-to-Text v1p1beta1 REST payloads.

use serde::{Deserialize, Serialize};

use crate::error::{SttError, SttResult};

#[derive(Debug, Serialize)]
pub(crate) struct RecognizeRequest {
    pub config: RecognitionConfig,
    pub audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognitionConfig {
    pub encoding: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
    pub language_code: String,
    pub enable_word_time_offsets: bool,
    pub enable_automatic_punctuation: bool,
    pub model: String,
    pub use_enhanced: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecognitionAudio {
    /// Base64 audio bytes
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecognizeResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub words: Vec<WordInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WordInfo {
    pub word: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Audio encoding name for a file extension.
pub(crate) fn encoding_for_extension(extension: &str) -> SttResult<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "wav" => Ok("LINEAR16"),
        "mp3" => Ok("MP3"),
        "flac" => Ok("FLAC"),
        "ogg" | "opus" => Ok("OGG_OPUS"),
        other => Err(SttError::UnsupportedAudio(other.to_string())),
    }
}

/// Parse a protobuf JSON duration such as `"1.300s"`.
pub(crate) fn parse_duration(value: &str) -> SttResult<f64> {
    let seconds = value
        .trim()
        .strip_suffix('s')
        .ok_or_else(|| SttError::invalid_response(format!("duration without unit: {:?}", value)))?;
    seconds
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .ok_or_else(|| SttError::invalid_response(format!("invalid duration {:?}", value)))
}
