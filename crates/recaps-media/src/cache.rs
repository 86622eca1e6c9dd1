//! Content-addressed cache for background videos.
//!
//! Entries are keyed by the SHA-256 of the source URL and are valid for a
//! TTL measured from the file's modification time. Writers copy into a
//! private temp file and rename it into place, so concurrent writers for the
//! same key never expose a partial file (last rename wins).

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use url::Url;

use crate::error::MediaResult;
use crate::fs_utils::remove_file_if_exists;

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Temp files older than this belong to an interrupted write.
const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Cache key for a source URL (lowercase SHA-256 hex).
pub fn cache_key(url: &Url) -> String {
    let digest = Sha256::digest(url.as_str().trim().as_bytes());
    format!("{:x}", digest)
}

/// Key-value store mapping cache keys to local files.
#[async_trait]
pub trait VideoCache: Send + Sync {
    /// Path of a live entry, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Option<PathBuf>;

    /// Store a copy of `source` under `key` and return the entry path.
    async fn put(&self, key: &str, source: &Path) -> MediaResult<PathBuf>;
}

/// [`VideoCache`] backed by a local directory.
#[derive(Debug)]
pub struct DiskVideoCache {
    dir: PathBuf,
    ttl: Duration,
    writes: AtomicU64,
}

impl DiskVideoCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            writes: AtomicU64::new(0),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.mp4", key))
    }

    fn is_fresh(&self, modified: SystemTime) -> bool {
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.ttl,
            // Modified "in the future" (clock skew): treat as fresh
            Err(_) => true,
        }
    }

    /// Remove temp files left behind by cancelled or crashed writers.
    ///
    /// Recent temp files may still be in use by a concurrent writer and are
    /// kept. Returns the number of files removed.
    async fn sweep_stale_temps(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with('.') && name.ends_with(".tmp")) {
                continue;
            }

            let stale = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .is_some_and(|age| age >= STALE_TEMP_AGE);
            if !stale {
                continue;
            }

            match remove_file_if_exists(&entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove stale cache temp {}: {}", entry.path().display(), e),
            }
        }

        if removed > 0 {
            debug!(removed, "Swept stale cache temp files");
        }
        removed
    }
}

#[async_trait]
impl VideoCache for DiskVideoCache {
    async fn get(&self, key: &str) -> Option<PathBuf> {
        let path = self.entry_path(key);
        let metadata = tokio::fs::metadata(&path).await.ok()?;
        if !metadata.is_file() {
            return None;
        }

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cache entry {} has no modification time: {}", path.display(), e);
                return None;
            }
        };

        if self.is_fresh(modified) {
            Some(path)
        } else {
            debug!(key, "Cache entry expired");
            None
        }
    }

    async fn put(&self, key: &str, source: &Path) -> MediaResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        self.sweep_stale_temps().await;

        let final_path = self.entry_path(key);
        let seq = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .dir
            .join(format!(".{}.{}.{}.tmp", key, std::process::id(), seq));

        let result = async {
            tokio::fs::copy(source, &tmp_path).await?;
            tokio::fs::rename(&tmp_path, &final_path).await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            let _ = remove_file_if_exists(&tmp_path).await;
            return Err(e.into());
        }

        debug!(key, path = %final_path.display(), "Cached background video");
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_sha256_hex() {
        let url = Url::parse("https://cdn.example.com/bg/1.mp4").unwrap();
        let key = cache_key(&url);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key(&url));

        let other = Url::parse("https://cdn.example.com/bg/2.mp4").unwrap();
        assert_ne!(key, cache_key(&other));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskVideoCache::new(dir.path().join("cache"), DEFAULT_CACHE_TTL);

        let source = dir.path().join("download.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();

        assert!(cache.get("abc").await.is_none());
        let stored = cache.put("abc", &source).await.unwrap();

        assert_eq!(cache.get("abc").await, Some(stored.clone()));
        assert_eq!(tokio::fs::read(&stored).await.unwrap(), b"video");
        // Source is copied, not moved
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskVideoCache::new(dir.path(), Duration::ZERO);

        let source = dir.path().join("download.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();
        cache.put("abc", &source).await.unwrap();

        assert!(cache.get("abc").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let cache = DiskVideoCache::new(&cache_dir, DEFAULT_CACHE_TTL);

        let first = dir.path().join("first.mp4");
        let second = dir.path().join("second.mp4");
        tokio::fs::write(&first, b"one").await.unwrap();
        tokio::fs::write(&second, b"two").await.unwrap();

        cache.put("k", &first).await.unwrap();
        let path = cache.put("k", &second).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"two");

        let mut entries = tokio::fs::read_dir(&cache_dir).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["k.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_put_sweeps_stale_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        std::fs::create_dir_all(&cache_dir).unwrap();
        let cache = DiskVideoCache::new(&cache_dir, DEFAULT_CACHE_TTL);

        // Left behind by a write that was cancelled mid-copy
        let abandoned = cache_dir.join(".k.4242.0.tmp");
        std::fs::write(&abandoned, b"half").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&abandoned)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(2 * 60 * 60))
            .unwrap();
        // Another writer still copying
        let in_flight = cache_dir.join(".other.4243.0.tmp");
        std::fs::write(&in_flight, b"busy").unwrap();

        let source = dir.path().join("download.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();
        cache.put("k", &source).await.unwrap();

        assert!(!abandoned.exists());
        assert!(in_flight.exists());
        assert!(cache_dir.join("k.mp4").exists());
    }

    #[tokio::test]
    async fn test_put_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskVideoCache::new(dir.path(), DEFAULT_CACHE_TTL);
        assert!(cache.put("k", &dir.path().join("missing.mp4")).await.is_err());
        assert!(cache.get("k").await.is_none());
    }
}
