//! Caption strategy chain.
//!
//! Sources are tried in order; the first one that yields at least one chunk
//! wins. Failures and empty results fall through to the next source.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use recaps_media::CaptionChunker;
use recaps_models::{CaptionChunk, CaptionMode, RenderJob};
use recaps_stt::{SttError, Transcriber};

use crate::error::{RenderError, RenderResult};

/// Inputs available to a caption source.
#[derive(Debug, Clone, Copy)]
pub struct CaptionContext<'a> {
    pub job: &'a RenderJob,
    /// Local voice track, when the job has one
    pub voice_path: Option<&'a Path>,
    /// Effective output duration in seconds
    pub duration: f64,
}

/// Why a source produced nothing.
#[derive(Debug, Error)]
pub enum CaptionSourceError {
    #[error("{0}")]
    Unavailable(&'static str),

    #[error("transcription failed: {0}")]
    Transcription(#[from] SttError),
}

/// One way of producing timed captions.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    fn mode(&self) -> CaptionMode;

    async fn generate(
        &self,
        chunker: &CaptionChunker,
        ctx: &CaptionContext<'_>,
    ) -> Result<Vec<CaptionChunk>, CaptionSourceError>;
}

/// Word timestamps supplied with the job.
pub struct SuppliedTimestamps;

#[async_trait]
impl CaptionSource for SuppliedTimestamps {
    fn mode(&self) -> CaptionMode {
        CaptionMode::Precise
    }

    async fn generate(
        &self,
        chunker: &CaptionChunker,
        ctx: &CaptionContext<'_>,
    ) -> Result<Vec<CaptionChunk>, CaptionSourceError> {
        match ctx.job.word_timestamps.as_deref() {
            Some(words) if !words.is_empty() => Ok(chunker.precise(words, ctx.duration)),
            _ => Err(CaptionSourceError::Unavailable("no word timestamps supplied")),
        }
    }
}

/// Word timestamps from transcribing the voice track.
pub struct Transcription {
    transcriber: Arc<dyn Transcriber>,
}

impl Transcription {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

#[async_trait]
impl CaptionSource for Transcription {
    fn mode(&self) -> CaptionMode {
        CaptionMode::Transcribed
    }

    async fn generate(
        &self,
        chunker: &CaptionChunker,
        ctx: &CaptionContext<'_>,
    ) -> Result<Vec<CaptionChunk>, CaptionSourceError> {
        let voice = ctx
            .voice_path
            .ok_or(CaptionSourceError::Unavailable("no voice track to transcribe"))?;
        debug!(provider = self.transcriber.name(), "Transcribing voice track");
        let words = self.transcriber.transcribe(voice).await?;
        Ok(chunker.precise(&words, ctx.duration))
    }
}

/// Uniform speaking-rate estimate from the script.
pub struct Estimated;

#[async_trait]
impl CaptionSource for Estimated {
    fn mode(&self) -> CaptionMode {
        CaptionMode::Estimated
    }

    async fn generate(
        &self,
        chunker: &CaptionChunker,
        ctx: &CaptionContext<'_>,
    ) -> Result<Vec<CaptionChunk>, CaptionSourceError> {
        // The chunker's placeholder is for previews; a render needs real text
        if ctx.job.script.split_whitespace().next().is_none() {
            return Err(CaptionSourceError::Unavailable("script is empty"));
        }
        Ok(chunker.estimated(&ctx.job.script, ctx.duration))
    }
}

/// Captions and the mode that produced them.
#[derive(Debug, Clone)]
pub struct GeneratedCaptions {
    pub mode: CaptionMode,
    pub chunks: Vec<CaptionChunk>,
}

/// Ordered list of caption sources.
pub struct CaptionPipeline {
    sources: Vec<Box<dyn CaptionSource>>,
}

impl CaptionPipeline {
    pub fn new(sources: Vec<Box<dyn CaptionSource>>) -> Self {
        Self { sources }
    }

    /// Supplied timestamps, then transcription (when available), then the
    /// estimate.
    pub fn standard(transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        let mut sources: Vec<Box<dyn CaptionSource>> = vec![Box::new(SuppliedTimestamps)];
        if let Some(transcriber) = transcriber {
            sources.push(Box::new(Transcription::new(transcriber)));
        }
        sources.push(Box::new(Estimated));
        Self::new(sources)
    }

    pub fn modes(&self) -> Vec<CaptionMode> {
        self.sources.iter().map(|s| s.mode()).collect()
    }

    pub async fn generate(
        &self,
        chunker: &CaptionChunker,
        ctx: &CaptionContext<'_>,
    ) -> RenderResult<GeneratedCaptions> {
        let mut failures = Vec::new();

        for source in &self.sources {
            let mode = source.mode();
            match source.generate(chunker, ctx).await {
                Ok(chunks) if !chunks.is_empty() => {
                    info!(mode = mode.as_str(), chunks = chunks.len(), "Captions generated");
                    return Ok(GeneratedCaptions { mode, chunks });
                }
                Ok(_) => {
                    debug!(mode = mode.as_str(), "Caption source produced no chunks");
                    failures.push(format!("{}: no chunks", mode));
                }
                Err(CaptionSourceError::Unavailable(reason)) => {
                    debug!(mode = mode.as_str(), reason, "Caption source skipped");
                    failures.push(format!("{}: {}", mode, reason));
                }
                Err(e) => {
                    warn!(mode = mode.as_str(), "Caption source failed, falling back: {}", e);
                    failures.push(format!("{}: {}", mode, e));
                }
            }
        }

        Err(RenderError::caption_generation(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recaps_media::CaptionConfig;
    use recaps_models::{MediaRef, WordTimestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTranscriber {
        words: Option<Vec<WordTimestamp>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn transcribe(&self, _audio_path: &Path) -> recaps_stt::SttResult<Vec<WordTimestamp>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.words.clone().ok_or(SttError::NoResults)
        }
    }

    fn job(script: &str) -> RenderJob {
        RenderJob::new(script, MediaRef::local("/bg.mp4"), 20.0, "/out/video.mp4")
    }

    fn chunker() -> CaptionChunker {
        CaptionChunker::new(CaptionConfig::default())
    }

    #[tokio::test]
    async fn test_supplied_timestamps_win() {
        let job = job("ignored script").with_word_timestamps(vec![
            WordTimestamp::new("Hello", 0.0, 0.5),
            WordTimestamp::new("world", 0.5, 1.0),
        ]);
        let ctx = CaptionContext {
            job: &job,
            voice_path: None,
            duration: 20.0,
        };
        let captions = CaptionPipeline::standard(None)
            .generate(&chunker(), &ctx)
            .await
            .unwrap();
        assert_eq!(captions.mode, CaptionMode::Precise);
        assert_eq!(captions.chunks[0].text, "HELLO WORLD");
    }

    #[tokio::test]
    async fn test_empty_timestamps_fall_through_transcription_to_estimate() {
        let transcriber = Arc::new(FakeTranscriber {
            words: None,
            calls: AtomicUsize::new(0),
        });
        let job = job("one two three four five six").with_word_timestamps(Vec::new());
        let ctx = CaptionContext {
            job: &job,
            voice_path: Some(Path::new("/tmp/voice.mp3")),
            duration: 20.0,
        };

        let pipeline = CaptionPipeline::standard(Some(transcriber.clone()));
        assert_eq!(
            pipeline.modes(),
            vec![CaptionMode::Precise, CaptionMode::Transcribed, CaptionMode::Estimated]
        );

        let captions = pipeline.generate(&chunker(), &ctx).await.unwrap();
        assert_eq!(captions.mode, CaptionMode::Estimated);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transcribed_words_are_used() {
        let transcriber = Arc::new(FakeTranscriber {
            words: Some(vec![WordTimestamp::new("spoken", 0.0, 0.4)]),
            calls: AtomicUsize::new(0),
        });
        let job = job("written script");
        let ctx = CaptionContext {
            job: &job,
            voice_path: Some(Path::new("/tmp/voice.mp3")),
            duration: 10.0,
        };

        let captions = CaptionPipeline::standard(Some(transcriber))
            .generate(&chunker(), &ctx)
            .await
            .unwrap();
        assert_eq!(captions.mode, CaptionMode::Transcribed);
        assert_eq!(captions.chunks[0].text, "SPOKEN");
    }

    #[tokio::test]
    async fn test_transcription_skipped_without_voice() {
        let transcriber = Arc::new(FakeTranscriber {
            words: Some(vec![WordTimestamp::new("unused", 0.0, 0.4)]),
            calls: AtomicUsize::new(0),
        });
        let job = job("text only");
        let ctx = CaptionContext {
            job: &job,
            voice_path: None,
            duration: 10.0,
        };

        let captions = CaptionPipeline::standard(Some(transcriber.clone()))
            .generate(&chunker(), &ctx)
            .await
            .unwrap();
        assert_eq!(captions.mode, CaptionMode::Estimated);
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_caption_generation_error() {
        let job = job("   ");
        let ctx = CaptionContext {
            job: &job,
            voice_path: None,
            duration: 20.0,
        };
        let err = CaptionPipeline::standard(None)
            .generate(&chunker(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::CaptionGeneration(_)));
        assert!(err.to_string().contains("script is empty"));
    }
}
