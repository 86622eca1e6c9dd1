//! Render orchestrator for recaps vertical videos.
//!
//! This crate provides:
//! - Render configuration from the environment
//! - The caption strategy chain (supplied timestamps, transcription, estimate)
//! - Single-job rendering with temp-artifact cleanup and cancellation
//! - Bounded concurrent batch rendering
//! - Structured job logging and Prometheus metrics

pub mod artifacts;
pub mod batch;
pub mod captions;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod renderer;

pub use artifacts::TempArtifacts;
pub use batch::render_batch;
pub use captions::{CaptionContext, CaptionPipeline, CaptionSource, CaptionSourceError, GeneratedCaptions};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use logging::JobLogger;
pub use renderer::{resolve_duration, Renderer};
