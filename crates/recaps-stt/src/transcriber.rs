//! Transcription seam used by the caption strategy chain.

use async_trait::async_trait;
use std::path::Path;

use recaps_models::WordTimestamp;

use crate::error::SttResult;

/// Produces per-word timestamps for an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    async fn transcribe(&self, audio_path: &Path) -> SttResult<Vec<WordTimestamp>>;
}
