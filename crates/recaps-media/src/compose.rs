//! Vertical-video compositor.
//!
//! Loops the background video under the voice track, burns in the caption
//! SRT and encodes an MP4 truncated to the requested duration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use recaps_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{build_composite_filter, AudioMix, CompositeFilter, Decoration, SubtitleStyle};
use crate::probe::probe_media;

/// Output frame and mix settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositorConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub subtitle_style: SubtitleStyle,
    pub voice_gain: f64,
    pub background_gain: f64,
    pub decorations: Vec<Decoration>,
    pub encoding: EncodingConfig,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            subtitle_style: SubtitleStyle::default(),
            voice_gain: 1.0,
            background_gain: 0.2,
            decorations: Decoration::defaults(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl CompositorConfig {
    pub fn without_decorations(mut self) -> Self {
        self.decorations.clear();
        self
    }

    pub fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(MediaError::invalid_config(format!(
                "frame {}x{}@{} must be non-zero",
                self.width, self.height, self.fps
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(MediaError::invalid_config(format!(
                "frame {}x{} must have even dimensions for {}",
                self.width, self.height, self.encoding.pixel_format
            )));
        }
        for (name, gain) in [
            ("voice_gain", self.voice_gain),
            ("background_gain", self.background_gain),
        ] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(MediaError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, gain
                )));
            }
        }
        Ok(())
    }
}

/// Files for one composite render.
#[derive(Debug, Clone)]
pub struct CompositeRequest<'a> {
    pub background: &'a Path,
    /// `None` renders a text-only video
    pub voice: Option<&'a Path>,
    /// `None` renders without burned-in captions
    pub subtitles: Option<&'a Path>,
    /// Output length in seconds
    pub duration: f64,
    pub output: &'a Path,
}

/// Result of a successful composite.
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    pub elapsed: Duration,
    pub audio: AudioMix,
}

/// Drives FFmpeg to produce the final video.
#[derive(Debug, Clone)]
pub struct Compositor {
    config: CompositorConfig,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Option<Duration>,
}

impl Compositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout: None,
        }
    }

    pub fn with_binaries(mut self, ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self.ffprobe = ffprobe.into();
        self
    }

    /// Kill FFmpeg after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Whether the background carries an audio stream.
    ///
    /// Probe failures assume it does.
    pub async fn background_has_audio(&self, background: &Path) -> bool {
        match probe_media(&self.ffprobe, background).await {
            Ok(info) => info.has_audio,
            Err(e) => {
                warn!(
                    path = %background.display(),
                    "Could not probe background audio, assuming present: {}",
                    e
                );
                true
            }
        }
    }

    /// Build the FFmpeg command for `request`.
    pub fn build_command(&self, request: &CompositeRequest<'_>, audio: AudioMix) -> FfmpegCommand {
        let config = &self.config;

        let mut cmd = FfmpegCommand::new(request.output).looped_input(request.background);
        if let Some(voice) = request.voice {
            cmd = cmd.input(voice);
        }

        let graph = build_composite_filter(&CompositeFilter {
            width: config.width,
            height: config.height,
            fps: config.fps,
            subtitles: request.subtitles.map(|path| (path, &config.subtitle_style)),
            decorations: &config.decorations,
            audio,
        });

        cmd = cmd.filter_complex(graph.graph).map(graph.video_label);
        if let Some(label) = graph.audio_label {
            cmd = cmd.map(label);
        }

        cmd = cmd
            .video_encoding(&config.encoding)
            .frame_rate(config.fps)
            .pixel_format(&config.encoding.pixel_format)
            .duration(request.duration);

        match graph.audio_label {
            Some(_) => cmd.audio_encoding(&config.encoding),
            None => cmd.no_audio(),
        }
    }

    /// Run the composite.
    ///
    /// A non-zero FFmpeg exit becomes [`MediaError::FfmpegFailed`] carrying
    /// the captured stderr and exit code.
    pub async fn compose(
        &self,
        request: &CompositeRequest<'_>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<CompositeOutput> {
        if !request.duration.is_finite() || request.duration <= 0.0 {
            return Err(MediaError::invalid_config(format!(
                "output duration must be positive, got {}",
                request.duration
            )));
        }

        let background_has_audio = self.background_has_audio(request.background).await;
        let audio = AudioMix::select(
            request.voice.is_some(),
            background_has_audio,
            self.config.voice_gain,
            self.config.background_gain,
        );

        if request.subtitles.is_none() {
            info!("No captions rendered");
        }

        let cmd = self.build_command(request, audio);

        let mut runner = FfmpegRunner::new().with_binary(&self.ffmpeg);
        if let Some(timeout) = self.timeout {
            runner = runner.with_timeout(timeout);
        }
        if let Some(cancel) = cancel {
            runner = runner.with_cancel(cancel);
        }

        let total = request.duration;
        let started = Instant::now();
        let output = runner
            .run_capture(&cmd, move |progress| {
                debug!(
                    percent = progress.percentage(total),
                    speed = progress.speed,
                    "Compositing progress"
                );
            })
            .await?;
        let elapsed = started.elapsed();

        if !output.success() {
            return Err(MediaError::ffmpeg_failed(
                match output.exit_code {
                    Some(code) => format!("FFmpeg exited with code {}", code),
                    None => "FFmpeg terminated by signal".to_string(),
                },
                Some(output.stderr),
                output.exit_code,
            ));
        }

        info!(
            output = %request.output.display(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Composite complete"
        );

        Ok(CompositeOutput { elapsed, audio })
    }
}
