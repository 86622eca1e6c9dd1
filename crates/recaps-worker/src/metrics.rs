//! Prometheus metrics for renders.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use recaps_media::{MediaKind, MediaOrigin};
use recaps_models::CaptionMode;

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const RENDERS_TOTAL: &str = "recaps_renders_total";
    pub const RENDER_FAILURES_TOTAL: &str = "recaps_render_failures_total";
    pub const CAPTION_MODE_TOTAL: &str = "recaps_caption_mode_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "recaps_ffmpeg_duration_seconds";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "recaps_download_duration_seconds";
    pub const CACHE_HITS_TOTAL: &str = "recaps_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "recaps_cache_misses_total";
    pub const CLEANUP_WARNINGS_TOTAL: &str = "recaps_cleanup_warnings_total";
}

/// Record a finished render.
pub fn record_render(success: bool) {
    let labels = [("status", if success { "success" } else { "failure" }.to_string())];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
}

/// Record a render failure by error kind.
pub fn record_render_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::RENDER_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_caption_mode(mode: CaptionMode) {
    let labels = [("mode", mode.as_str().to_string())];
    counter!(names::CAPTION_MODE_TOTAL, &labels).increment(1);
}

pub fn record_ffmpeg_duration(duration_secs: f64) {
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}

/// Record how a media input was resolved.
///
/// Cache hit/miss counters only count lookups that went to a cache.
pub fn record_media_resolution(kind: MediaKind, origin: &MediaOrigin, cache_enabled: bool) {
    let cached_kind = cache_enabled && kind == MediaKind::BackgroundVideo;
    match origin {
        MediaOrigin::Local => {}
        MediaOrigin::CacheHit => {
            counter!(names::CACHE_HITS_TOTAL).increment(1);
        }
        MediaOrigin::Downloaded { elapsed, .. } => {
            if cached_kind {
                counter!(names::CACHE_MISSES_TOTAL).increment(1);
            }
            let labels = [("kind", kind.as_str().to_string())];
            histogram!(names::DOWNLOAD_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
        }
    }
}

pub fn record_cleanup_warnings(count: usize) {
    if count > 0 {
        counter!(names::CLEANUP_WARNINGS_TOTAL).increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_names_are_prefixed() {
        for name in [
            names::RENDERS_TOTAL,
            names::RENDER_FAILURES_TOTAL,
            names::CAPTION_MODE_TOTAL,
            names::FFMPEG_DURATION_SECONDS,
            names::DOWNLOAD_DURATION_SECONDS,
            names::CACHE_HITS_TOTAL,
            names::CACHE_MISSES_TOTAL,
            names::CLEANUP_WARNINGS_TOTAL,
        ] {
            assert!(name.starts_with("recaps_"), "{}", name);
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_render(true);
        record_render_failure("compositor");
        record_caption_mode(CaptionMode::Estimated);
        record_ffmpeg_duration(1.5);
        record_media_resolution(
            MediaKind::BackgroundVideo,
            &MediaOrigin::Downloaded {
                bytes: 10,
                elapsed: Duration::from_millis(20),
            },
            true,
        );
        record_cleanup_warnings(2);
    }
}
