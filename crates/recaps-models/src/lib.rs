//! Shared data models for the recaps render pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Word timestamps and caption chunks
//! - Media references (local paths or remote URLs)
//! - Render jobs, their state machine and outcomes
//! - Encoding configuration
//! - SRT timestamp formatting

pub mod caption;
pub mod encoding;
pub mod job;
pub mod media_ref;
pub mod timestamp;
pub mod word;

// Re-export common types
pub use caption::{CaptionChunk, CaptionMode};
pub use encoding::EncodingConfig;
pub use job::{JobId, RenderJob, RenderOutcome, RenderState};
pub use media_ref::{MediaRef, MediaRefError};
pub use timestamp::{format_srt_timestamp, parse_srt_timestamp, TimestampError};
pub use word::WordTimestamp;
