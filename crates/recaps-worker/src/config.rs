//! Render configuration.

use std::path::PathBuf;
use std::time::Duration;

use recaps_media::{CaptionConfig, ChunkSizing, CompositorConfig, DEFAULT_CACHE_TTL};

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Work directory for per-job temporary files
    pub work_dir: PathBuf,
    /// Background-video cache directory (`None` disables caching)
    pub cache_dir: Option<PathBuf>,
    /// Cache entry lifetime
    pub cache_ttl: Duration,
    /// FFmpeg is killed after this long
    pub render_timeout: Duration,
    /// Hard cap on output duration in seconds
    pub max_video_duration: f64,
    /// Duration used when neither the job nor the voice track gives one
    pub fallback_duration: f64,
    /// Maximum renders running at once in a batch
    pub max_concurrent_renders: usize,
    /// Per-download timeout
    pub download_timeout: Duration,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub captions: CaptionConfig,
    pub compositor: CompositorConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let work_dir = PathBuf::from("/tmp/recaps");
        Self {
            cache_dir: Some(work_dir.join("cache")),
            work_dir,
            cache_ttl: DEFAULT_CACHE_TTL,
            render_timeout: Duration::from_secs(600), // 10 minutes
            max_video_duration: 60.0,
            fallback_duration: 20.0,
            max_concurrent_renders: 2,
            download_timeout: Duration::from_secs(300),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            captions: CaptionConfig::default(),
            compositor: CompositorConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let work_dir = std::env::var("RENDER_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.work_dir);

        // Empty value disables the cache
        let cache_dir = match std::env::var("RENDER_CACHE_DIR") {
            Ok(dir) if dir.trim().is_empty() => None,
            Ok(dir) => Some(PathBuf::from(dir)),
            Err(_) => Some(work_dir.join("cache")),
        };

        let mut captions = defaults.captions;
        if let Some(min) = env_parse("CAPTION_MIN_SECS") {
            captions.min_duration = min;
        }
        if let Some(max) = env_parse("CAPTION_MAX_SECS") {
            captions.max_duration = max;
        }
        if let Ok(sizing) = std::env::var("CAPTION_SIZING") {
            captions.sizing = match sizing.trim().to_lowercase().as_str() {
                "weighted_random" | "random" => ChunkSizing::WeightedRandom {
                    seed: env_parse("CAPTION_SEED").unwrap_or(0),
                },
                _ => ChunkSizing::Linguistic,
            };
        }

        Self {
            work_dir,
            cache_dir,
            cache_ttl: env_parse("RENDER_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            render_timeout: env_parse("RENDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_timeout),
            max_video_duration: env_parse("RENDER_MAX_VIDEO_SECS").unwrap_or(defaults.max_video_duration),
            fallback_duration: env_parse("RENDER_FALLBACK_DURATION_SECS")
                .unwrap_or(defaults.fallback_duration),
            max_concurrent_renders: env_parse("RENDER_MAX_CONCURRENT")
                .unwrap_or(defaults.max_concurrent_renders),
            download_timeout: env_parse("RENDER_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: std::env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            captions,
            compositor: defaults.compositor,
        }
    }

    /// Rooted at `work_dir`, with the cache underneath it.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        if self.cache_dir.is_some() {
            self.cache_dir = Some(work_dir.join("cache"));
        }
        self.work_dir = work_dir;
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        self.captions.validate().map_err(|e| e.to_string())?;
        self.compositor.validate().map_err(|e| e.to_string())?;
        if !(self.max_video_duration.is_finite() && self.max_video_duration > 0.0) {
            return Err(format!(
                "max_video_duration must be positive, got {}",
                self.max_video_duration
            ));
        }
        if !(self.fallback_duration.is_finite() && self.fallback_duration > 0.0) {
            return Err(format!(
                "fallback_duration must be positive, got {}",
                self.fallback_duration
            ));
        }
        if self.max_concurrent_renders == 0 {
            return Err("max_concurrent_renders must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_video_duration, 60.0);
        assert_eq!(config.fallback_duration, 20.0);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/recaps/cache")));
    }

    #[test]
    fn test_with_work_dir_moves_cache() {
        let config = RenderConfig::default().with_work_dir("/data/render");
        assert_eq!(config.work_dir, PathBuf::from("/data/render"));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/data/render/cache")));

        let uncached = RenderConfig {
            cache_dir: None,
            ..Default::default()
        }
        .with_work_dir("/data/render");
        assert_eq!(uncached.cache_dir, None);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = RenderConfig {
            max_concurrent_renders: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
