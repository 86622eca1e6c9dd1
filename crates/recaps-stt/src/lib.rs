//! Speech-to-text for caption timing.
//!
//! [`Transcriber`] is the seam the render pipeline depends on;
//! [`GoogleSttClient`] implements it against the Google Speech-to-Text REST
//! API with word time offsets enabled.

pub mod client;
pub mod error;
pub mod transcriber;
mod types;

pub use client::{GoogleSttClient, SttConfig};
pub use error::{SttError, SttResult};
pub use transcriber::Transcriber;
