//! Parsing of FFmpeg `-progress pipe:2` output.
//!
//! FFmpeg interleaves `key=value` progress records with its regular log
//! lines on stderr. [`ProgressParser`] consumes lines one at a time and
//! tells the caller which ones belong to the progress stream so the rest can
//! be kept as diagnostic stderr.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage for an output of `total_seconds`.
    pub fn percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / 1000.0 / total_seconds) * 100.0).clamp(0.0, 100.0)
    }

    /// Estimated seconds until completion at the current speed.
    pub fn eta_seconds(&self, total_seconds: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }
        let remaining = total_seconds - self.out_time_ms as f64 / 1000.0;
        Some((remaining.max(0.0)) / self.speed)
    }
}

/// Classification of one stderr line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressLine {
    /// A progress record finished (`progress=continue|end`).
    Snapshot(FfmpegProgress),
    /// Part of a progress record.
    Field,
    /// Regular FFmpeg log output.
    Log,
}

/// Keys FFmpeg emits in a `-progress` record.
const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "stream_0_0_q",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Incremental parser for the progress stream.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of stderr.
    pub fn feed(&mut self, line: &str) -> ProgressLine {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            return ProgressLine::Log;
        };
        if !PROGRESS_KEYS.contains(&key) {
            return ProgressLine::Log;
        }

        match key {
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            // Despite the name, FFmpeg reports microseconds here too
            "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.current.fps = fps;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return ProgressLine::Snapshot(self.current.clone());
            }
            _ => {}
        }

        ProgressLine::Field
    }

    /// Latest progress values seen.
    pub fn current(&self) -> &FfmpegProgress {
        &self.current
    }
}
