//! Caption chunking.
//!
//! Groups a word stream into short (1-3 word) on-screen captions and assigns
//! each a display window. Two timing modes exist:
//!
//! - [`CaptionChunker::precise`] uses per-word timestamps
//! - [`CaptionChunker::estimated`] spreads the script over the duration at a
//!   uniform speaking rate
//!
//! Both modes guarantee `start < end` for every chunk and
//! `chunk[i].end <= chunk[i + 1].start`, and never drop a word.

mod estimated;
pub mod grouping;
mod precise;
mod stats;
mod timing;

use serde::{Deserialize, Serialize};

use recaps_models::{CaptionChunk, WordTimestamp};

use crate::error::{MediaError, MediaResult};

pub use grouping::ChunkSizing;
pub use stats::CaptionStats;

/// Placeholder shown when the script has no words.
pub const NO_TEXT_PLACEHOLDER: &str = "NO TEXT";

/// Timing thresholds for caption generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionConfig {
    /// Minimum on-screen time in seconds
    pub min_duration: f64,
    /// Maximum on-screen time in seconds
    pub max_duration: f64,
    /// Preferred gap between consecutive captions
    pub gap: f64,
    /// How much earlier than the estimated speech a caption appears (estimated mode)
    pub lead_time: f64,
    /// Share of the duration assumed to be speech (estimated mode)
    pub pause_factor: f64,
    /// Display duration multiplier over the speech duration (estimated mode)
    pub extension_factor: f64,
    /// Minimum re-applied after overlap clipping (estimated mode)
    pub reduced_min_duration: f64,
    /// How many words go into each caption
    pub sizing: ChunkSizing,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            min_duration: 3.5,
            max_duration: 8.0,
            gap: 0.1,
            lead_time: 0.3,
            pause_factor: 0.85,
            extension_factor: 2.5,
            reduced_min_duration: 0.5,
            sizing: ChunkSizing::default(),
        }
    }
}

impl CaptionConfig {
    /// Reject thresholds that cannot produce valid captions.
    pub fn validate(&self) -> MediaResult<()> {
        let positive = [
            ("min_duration", self.min_duration),
            ("max_duration", self.max_duration),
            ("pause_factor", self.pause_factor),
            ("extension_factor", self.extension_factor),
            ("reduced_min_duration", self.reduced_min_duration),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(MediaError::invalid_config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [("gap", self.gap), ("lead_time", self.lead_time)] {
            if !value.is_finite() || value < 0.0 {
                return Err(MediaError::invalid_config(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if self.min_duration > self.max_duration {
            return Err(MediaError::invalid_config(format!(
                "min_duration {} exceeds max_duration {}",
                self.min_duration, self.max_duration
            )));
        }

        if self.pause_factor > 1.0 {
            return Err(MediaError::invalid_config(format!(
                "pause_factor must be at most 1.0, got {}",
                self.pause_factor
            )));
        }

        Ok(())
    }
}

/// Turns words into timed caption chunks.
#[derive(Debug, Clone, Default)]
pub struct CaptionChunker {
    config: CaptionConfig,
}

impl CaptionChunker {
    pub fn new(config: CaptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptionConfig {
        &self.config
    }

    /// Chunk words with known timestamps.
    ///
    /// Returns an empty list when no usable words are given.
    pub fn precise(&self, words: &[WordTimestamp], total_duration: f64) -> Vec<CaptionChunk> {
        precise::chunk(&self.config, words, total_duration)
    }

    /// Chunk a script with estimated timing over `duration` seconds.
    ///
    /// An empty script yields a single [`NO_TEXT_PLACEHOLDER`] chunk that
    /// spans the whole duration.
    pub fn estimated(&self, script: &str, duration: f64) -> Vec<CaptionChunk> {
        estimated::chunk(&self.config, script, duration)
    }
}
