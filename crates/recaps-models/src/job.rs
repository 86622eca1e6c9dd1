//! Render job definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{CaptionMode, MediaRef, WordTimestamp};

/// Unique identifier for a render job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Characters safe to embed in a file name.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to render one captioned vertical video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJob {
    /// Unique job ID (generated when absent)
    #[serde(default)]
    pub job_id: JobId,

    /// Narration script, already cleaned by the script generator
    pub script: String,

    /// Looping background video
    pub background_video: MediaRef,

    /// Synthesized voice track; `None` renders a text-only video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_audio: Option<MediaRef>,

    /// Requested output duration in seconds
    pub target_duration_seconds: f64,

    /// Final MP4 location
    pub output_path: PathBuf,

    /// Per-word timing from TTS alignment, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_timestamps: Option<Vec<WordTimestamp>>,
}

impl RenderJob {
    pub fn new(
        script: impl Into<String>,
        background_video: MediaRef,
        target_duration_seconds: f64,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            job_id: JobId::new(),
            script: script.into(),
            background_video,
            voice_audio: None,
            target_duration_seconds,
            output_path: output_path.into(),
            word_timestamps: None,
        }
    }

    pub fn with_voice(mut self, voice_audio: MediaRef) -> Self {
        self.voice_audio = Some(voice_audio);
        self
    }

    pub fn with_word_timestamps(mut self, words: Vec<WordTimestamp>) -> Self {
        self.word_timestamps = Some(words);
        self
    }

    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }

    /// Whether the requested duration is usable as-is.
    pub fn has_valid_target_duration(&self) -> bool {
        self.target_duration_seconds.is_finite() && self.target_duration_seconds > 0.0
    }
}

/// Lifecycle of a render job.
///
/// `Created → ResolvingMedia → GeneratingCaptions → Compositing → Succeeded`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    #[default]
    Created,
    ResolvingMedia,
    GeneratingCaptions,
    Compositing,
    Succeeded,
    Failed,
}

impl RenderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::Created => "created",
            RenderState::ResolvingMedia => "resolving_media",
            RenderState::GeneratingCaptions => "generating_captions",
            RenderState::Compositing => "compositing",
            RenderState::Succeeded => "succeeded",
            RenderState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderState::Succeeded | RenderState::Failed)
    }

    /// Check whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: RenderState) -> bool {
        use RenderState::*;
        match (self, next) {
            (Succeeded | Failed, _) => false,
            (_, Failed) => true,
            (Created, ResolvingMedia)
            | (ResolvingMedia, GeneratingCaptions)
            | (GeneratingCaptions, Compositing)
            | (Compositing, Succeeded) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful result of a render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutcome {
    pub job_id: JobId,
    pub output_path: PathBuf,
    pub caption_mode: CaptionMode,
    pub caption_count: usize,
    /// Duration the output was capped to
    pub duration_seconds: f64,
    /// Wall-clock render time
    pub elapsed_seconds: f64,
    pub completed_at: DateTime<Utc>,
    /// Temp-file removal or cache population problems (never fatal)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use RenderState::*;
        assert!(Created.can_transition_to(ResolvingMedia));
        assert!(ResolvingMedia.can_transition_to(GeneratingCaptions));
        assert!(GeneratingCaptions.can_transition_to(Compositing));
        assert!(Compositing.can_transition_to(Succeeded));
        assert!(ResolvingMedia.can_transition_to(Failed));

        assert!(!Created.can_transition_to(Compositing));
        assert!(!Created.can_transition_to(Succeeded));
        assert!(!Succeeded.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(ResolvingMedia));
    }

    #[test]
    fn test_render_job_deserialize() {
        let json = r#"{
            "script": "Mitochondria is the powerhouse of the cell",
            "backgroundVideo": "https://cdn.example.com/minecraft/1.mp4",
            "voiceAudio": "/tmp/voice.mp3",
            "targetDurationSeconds": 12.5,
            "outputPath": "/tmp/out/video.mp4",
            "wordTimestamps": [{"word": "Mitochondria", "startTime": 0.0, "endTime": 0.6}]
        }"#;

        let job: RenderJob = serde_json::from_str(json).unwrap();
        assert!(job.background_video.is_remote());
        assert!(!job.voice_audio.as_ref().unwrap().is_remote());
        assert_eq!(job.word_timestamps.as_ref().unwrap().len(), 1);
        assert!(!job.job_id.as_str().is_empty());
        assert!(job.has_valid_target_duration());
    }

    #[test]
    fn test_invalid_target_duration() {
        let job = RenderJob::new("x", MediaRef::local("/bg.mp4"), f64::NAN, "/out.mp4");
        assert!(!job.has_valid_target_duration());
        let job = RenderJob::new("x", MediaRef::local("/bg.mp4"), 0.0, "/out.mp4");
        assert!(!job.has_valid_target_duration());
    }

    #[test]
    fn test_job_id_file_stem() {
        let id = JobId::from_string("topic 3/intro");
        assert_eq!(id.file_stem(), "topic_3_intro");
    }
}
