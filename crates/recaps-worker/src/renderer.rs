//! Render orchestrator.
//!
//! Runs one job through media resolution, caption generation and
//! compositing. Temporary artifacts are removed whatever the result, and the
//! final output path only ever receives a complete file.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

use recaps_media::command::{is_cancelled, wait_for_cancel};
use recaps_media::fs_utils::move_file;
use recaps_media::{
    probe_duration, write_srt, CaptionChunker, CaptionStats, CompositeRequest, Compositor, DiskVideoCache,
    Downloader, MediaKind, MediaResolver, VideoCache,
};
use recaps_models::{CaptionMode, MediaRef, RenderJob, RenderOutcome, RenderState};
use recaps_stt::Transcriber;

use crate::artifacts::TempArtifacts;
use crate::captions::{CaptionContext, CaptionPipeline};
use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::logging::JobLogger;
use crate::metrics;

/// Output duration: the target capped at `max`, else the probed voice
/// duration capped the same way, else the fallback.
pub fn resolve_duration(target: f64, probed_voice: Option<f64>, max: f64, fallback: f64) -> f64 {
    let usable = |d: f64| d.is_finite() && d > 0.0;
    if usable(target) {
        return target.min(max);
    }
    match probed_voice.filter(|d| usable(*d)) {
        Some(voice) => voice.min(max),
        None => fallback.min(max),
    }
}

/// Per-job paths under the work directory and next to the output.
#[derive(Debug, Clone)]
struct RenderPaths {
    work_dir: PathBuf,
    partial_output: PathBuf,
    subtitles: PathBuf,
}

#[derive(Debug)]
struct RenderSummary {
    caption_mode: CaptionMode,
    caption_count: usize,
    duration: f64,
}

/// Renders [`RenderJob`]s.
pub struct Renderer {
    config: RenderConfig,
    resolver: MediaResolver,
    cache_enabled: bool,
    chunker: CaptionChunker,
    captions: CaptionPipeline,
    compositor: Compositor,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate().map_err(RenderError::config)?;

        let mut resolver = MediaResolver::new(Downloader::new(config.download_timeout)?);
        let cache_enabled = config.cache_dir.is_some();
        if let Some(dir) = &config.cache_dir {
            resolver = resolver.with_cache(Arc::new(DiskVideoCache::new(dir.clone(), config.cache_ttl)));
        }

        let compositor = Compositor::new(config.compositor.clone())
            .with_binaries(config.ffmpeg_path.clone(), config.ffprobe_path.clone())
            .with_timeout(config.render_timeout);

        Ok(Self {
            resolver,
            cache_enabled,
            chunker: CaptionChunker::new(config.captions.clone()),
            captions: CaptionPipeline::standard(None),
            compositor,
            config,
        })
    }

    /// Try transcribing the voice track before estimating captions.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.captions = CaptionPipeline::standard(Some(transcriber));
        self
    }

    pub fn with_caption_pipeline(mut self, captions: CaptionPipeline) -> Self {
        self.captions = captions;
        self
    }

    /// Replace the background-video cache.
    pub fn with_cache(mut self, cache: Arc<dyn VideoCache>) -> Self {
        self.resolver = self.resolver.with_cache(cache);
        self.cache_enabled = true;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render one job.
    ///
    /// `cancel` turning `true` kills the compositor; cleanup still runs.
    pub async fn render(
        &self,
        job: &RenderJob,
        cancel: Option<watch::Receiver<bool>>,
    ) -> RenderResult<RenderOutcome> {
        let logger = JobLogger::new(&job.job_id, "render");
        let span = logger.create_span();
        self.render_job(job, cancel, logger).instrument(span).await
    }

    async fn render_job(
        &self,
        job: &RenderJob,
        cancel: Option<watch::Receiver<bool>>,
        logger: JobLogger,
    ) -> RenderResult<RenderOutcome> {
        let started = Instant::now();
        logger.log_start(&format!("rendering {}", job.output_path.display()));

        let mut state = RenderState::Created;
        let mut artifacts = TempArtifacts::new();

        let result = if cancel.as_ref().is_some_and(is_cancelled) {
            Err(RenderError::Cancelled)
        } else {
            let pipeline = self.run_pipeline(job, &mut artifacts, &mut state, &logger, cancel.clone());
            tokio::pin!(pipeline);
            tokio::select! {
                result = &mut pipeline => result,
                _ = wait_for_cancel(cancel) => Err(RenderError::Cancelled),
            }
        };

        let cleanup_warnings = artifacts.cleanup().await;
        for warning in &cleanup_warnings {
            logger.log_warning(warning);
        }
        metrics::record_cleanup_warnings(cleanup_warnings.len());

        match result {
            Ok(summary) => {
                advance(&mut state, RenderState::Succeeded, &logger);
                metrics::record_render(true);

                let outcome = RenderOutcome {
                    job_id: job.job_id.clone(),
                    output_path: job.output_path.clone(),
                    caption_mode: summary.caption_mode,
                    caption_count: summary.caption_count,
                    duration_seconds: summary.duration,
                    elapsed_seconds: started.elapsed().as_secs_f64(),
                    completed_at: Utc::now(),
                    cleanup_warnings,
                };
                logger.log_completion(&format!(
                    "{} captions ({}), {:.1}s video in {:.1}s",
                    outcome.caption_count, outcome.caption_mode, outcome.duration_seconds, outcome.elapsed_seconds
                ));
                Ok(outcome)
            }
            Err(e) => {
                advance(&mut state, RenderState::Failed, &logger);
                metrics::record_render(false);
                metrics::record_render_failure(e.kind());

                logger.log_error(&e.to_string());
                if let Some(stderr) = e.stderr() {
                    warn!(job_id = %job.job_id, "FFmpeg stderr:\n{}", stderr);
                }
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        job: &RenderJob,
        artifacts: &mut TempArtifacts,
        state: &mut RenderState,
        logger: &JobLogger,
        cancel: Option<watch::Receiver<bool>>,
    ) -> RenderResult<RenderSummary> {
        let paths = self.plan_paths(job)?;
        tokio::fs::create_dir_all(&paths.work_dir).await?;
        artifacts.track_dir(&paths.work_dir);
        artifacts.track_file(&paths.partial_output);

        advance(state, RenderState::ResolvingMedia, logger);
        let background = self
            .resolve_input(
                &job.background_video,
                MediaKind::BackgroundVideo,
                &paths.work_dir,
                "background",
                artifacts,
                logger,
            )
            .await?;
        let voice = match &job.voice_audio {
            Some(media) => Some(
                self.resolve_input(media, MediaKind::VoiceAudio, &paths.work_dir, "voice", artifacts, logger)
                    .await?,
            ),
            None => {
                logger.log_progress("no voice track, rendering text-only video");
                None
            }
        };

        let duration = self.effective_duration(job, voice.as_deref()).await;
        debug!(duration, target = job.target_duration_seconds, "Effective duration");

        advance(state, RenderState::GeneratingCaptions, logger);
        let ctx = CaptionContext {
            job,
            voice_path: voice.as_deref(),
            duration,
        };
        let captions = self.captions.generate(&self.chunker, &ctx).await?;
        metrics::record_caption_mode(captions.mode);

        let stats = CaptionStats::from_chunks(&captions.chunks, duration);
        info!(
            mode = captions.mode.as_str(),
            count = stats.count,
            average_duration = stats.average_duration,
            coverage_percent = stats.coverage_percent,
            gaps = stats.gaps,
            overlaps = stats.overlaps,
            "Caption stats"
        );

        let subtitles = if captions.chunks.is_empty() {
            None
        } else {
            write_srt(&captions.chunks, &paths.subtitles).await?;
            artifacts.track_file(&paths.subtitles);
            Some(paths.subtitles.as_path())
        };

        advance(state, RenderState::Compositing, logger);
        let request = CompositeRequest {
            background: &background,
            voice: voice.as_deref(),
            subtitles,
            duration,
            output: &paths.partial_output,
        };
        let composite = self.compositor.compose(&request, cancel).await?;
        metrics::record_ffmpeg_duration(composite.elapsed.as_secs_f64());

        move_file(&paths.partial_output, &job.output_path).await?;

        Ok(RenderSummary {
            caption_mode: captions.mode,
            caption_count: captions.chunks.len(),
            duration,
        })
    }

    fn plan_paths(&self, job: &RenderJob) -> RenderResult<RenderPaths> {
        let file_name = job
            .output_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| RenderError::invalid_job("output path has no file name"))?;

        let unique = format!(
            "{}-{}",
            job.job_id.file_stem(),
            Utc::now().format("%Y%m%d%H%M%S%3f")
        );
        let work_dir = self.config.work_dir.join(&unique);

        Ok(RenderPaths {
            partial_output: job
                .output_path
                .with_file_name(format!(".{}.{}.partial.mp4", file_name, unique)),
            subtitles: work_dir.join("captions.srt"),
            work_dir,
        })
    }

    async fn resolve_input(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        work_dir: &Path,
        stem: &str,
        artifacts: &mut TempArtifacts,
        logger: &JobLogger,
    ) -> RenderResult<PathBuf> {
        let resolved = self.resolver.resolve(media, kind, work_dir, stem).await?;
        if resolved.is_temp() {
            artifacts.track_file(&resolved.path);
        }
        metrics::record_media_resolution(kind, &resolved.origin, self.cache_enabled);
        for warning in &resolved.warnings {
            logger.log_warning(warning);
        }
        Ok(resolved.path)
    }

    async fn effective_duration(&self, job: &RenderJob, voice: Option<&Path>) -> f64 {
        let probed = match (job.has_valid_target_duration(), voice) {
            (false, Some(voice)) => match probe_duration(&self.config.ffprobe_path, voice).await {
                Ok(duration) => duration,
                Err(e) => {
                    warn!("Could not probe voice duration: {}", e);
                    None
                }
            },
            _ => None,
        };
        resolve_duration(
            job.target_duration_seconds,
            probed,
            self.config.max_video_duration,
            self.config.fallback_duration,
        )
    }
}

fn advance(state: &mut RenderState, next: RenderState, logger: &JobLogger) {
    if !state.can_transition_to(next) {
        logger.log_warning(&format!("unexpected transition {} -> {}", state, next));
    }
    logger.log_transition(*state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_duration_caps_target() {
        assert_eq!(resolve_duration(45.0, None, 60.0, 20.0), 45.0);
        assert_eq!(resolve_duration(120.0, Some(30.0), 60.0, 20.0), 60.0);
    }

    #[test]
    fn test_resolve_duration_falls_back_to_voice_then_default() {
        assert_eq!(resolve_duration(0.0, Some(33.5), 60.0, 20.0), 33.5);
        assert_eq!(resolve_duration(f64::NAN, Some(95.0), 60.0, 20.0), 60.0);
        assert_eq!(resolve_duration(-1.0, None, 60.0, 20.0), 20.0);
        assert_eq!(resolve_duration(0.0, Some(0.0), 60.0, 20.0), 20.0);
        assert_eq!(resolve_duration(0.0, None, 10.0, 20.0), 10.0);
    }

    #[test]
    fn test_plan_paths_are_unique_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(RenderConfig::default().with_work_dir(dir.path())).unwrap();

        let job = RenderJob::new("script", MediaRef::local("/bg.mp4"), 10.0, "/out/final.mp4")
            .with_job_id(recaps_models::JobId::from_string("job/1"));
        let paths = renderer.plan_paths(&job).unwrap();

        assert!(paths.work_dir.starts_with(dir.path()));
        let work_name = paths.work_dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(work_name.starts_with("job_1-"));
        assert_eq!(paths.partial_output.parent(), Some(Path::new("/out")));
        let partial_name = paths.partial_output.file_name().unwrap().to_string_lossy().to_string();
        assert!(partial_name.starts_with(".final.mp4.job_1-"));
        assert!(partial_name.ends_with(".partial.mp4"));

        let other = job.clone().with_job_id(recaps_models::JobId::from_string("job-2"));
        assert_ne!(renderer.plan_paths(&other).unwrap().work_dir, paths.work_dir);
    }

    #[test]
    fn test_output_without_file_name_is_invalid() {
        let renderer = Renderer::new(RenderConfig::default()).unwrap();
        let job = RenderJob::new("script", MediaRef::local("/bg.mp4"), 10.0, "/");
        assert!(matches!(renderer.plan_paths(&job), Err(RenderError::InvalidJob(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RenderConfig {
            max_video_duration: 0.0,
            ..Default::default()
        };
        assert!(matches!(Renderer::new(config), Err(RenderError::Config(_))));
    }
}
