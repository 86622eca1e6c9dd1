//! Makes job media available as local files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use recaps_models::MediaRef;

use crate::cache::{cache_key, VideoCache};
use crate::download::Downloader;
use crate::error::{MediaError, MediaResult};

/// What a media input is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    BackgroundVideo,
    VoiceAudio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::BackgroundVideo => "background_video",
            MediaKind::VoiceAudio => "voice_audio",
        }
    }

    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::BackgroundVideo => "mp4",
            MediaKind::VoiceAudio => "mp3",
        }
    }
}

/// Where a resolved file came from.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaOrigin {
    /// Local path passed through unchanged
    Local,
    /// Served from the background-video cache
    CacheHit,
    /// Downloaded for this job
    Downloaded { bytes: u64, elapsed: Duration },
}

/// A media input available on local disk.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub path: PathBuf,
    pub origin: MediaOrigin,
    /// Non-fatal problems (e.g. the download could not be cached)
    pub warnings: Vec<String>,
}

impl ResolvedMedia {
    /// Whether the file belongs to the job and must be deleted afterwards.
    pub fn is_temp(&self) -> bool {
        matches!(self.origin, MediaOrigin::Downloaded { .. })
    }
}

/// Resolves [`MediaRef`]s to local files, downloading remote ones.
#[derive(Clone)]
pub struct MediaResolver {
    downloader: Downloader,
    cache: Option<Arc<dyn VideoCache>>,
}

impl MediaResolver {
    pub fn new(downloader: Downloader) -> Self {
        Self {
            downloader,
            cache: None,
        }
    }

    /// Serve background videos through `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn VideoCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolve `media`, downloading into `temp_dir` as `{stem}.{ext}` when
    /// remote.
    pub async fn resolve(
        &self,
        media: &MediaRef,
        kind: MediaKind,
        temp_dir: &Path,
        stem: &str,
    ) -> MediaResult<ResolvedMedia> {
        match media {
            MediaRef::Local(path) => {
                let is_file = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
                if !is_file {
                    return Err(MediaError::FileNotFound(path.clone()));
                }
                debug!(kind = kind.as_str(), path = %path.display(), "Using local media");
                Ok(ResolvedMedia {
                    path: path.clone(),
                    origin: MediaOrigin::Local,
                    warnings: Vec::new(),
                })
            }
            MediaRef::Remote(url) => {
                let cache = match kind {
                    MediaKind::BackgroundVideo => self.cache.as_ref(),
                    MediaKind::VoiceAudio => None,
                };
                let key = cache_key(url);

                if let Some(cache) = cache {
                    if let Some(path) = cache.get(&key).await {
                        info!(kind = kind.as_str(), url = %media.redacted(), "Cache hit");
                        return Ok(ResolvedMedia {
                            path,
                            origin: MediaOrigin::CacheHit,
                            warnings: Vec::new(),
                        });
                    }
                    debug!(kind = kind.as_str(), url = %media.redacted(), "Cache miss");
                }

                let extension = media
                    .extension()
                    .filter(|ext| !ext.is_empty() && ext.len() <= 5)
                    .unwrap_or_else(|| kind.default_extension().to_string());
                let dest = temp_dir.join(format!("{}.{}", stem, extension));

                let stats = self.downloader.download(url, &dest).await?;

                let mut warnings = Vec::new();
                if let Some(cache) = cache {
                    if let Err(e) = cache.put(&key, &dest).await {
                        warn!(url = %media.redacted(), "Failed to cache background video: {}", e);
                        warnings.push(format!("cache population failed for {}: {}", media.redacted(), e));
                    }
                }

                Ok(ResolvedMedia {
                    path: dest,
                    origin: MediaOrigin::Downloaded {
                        bytes: stats.bytes,
                        elapsed: stats.elapsed,
                    },
                    warnings,
                })
            }
        }
    }
}
