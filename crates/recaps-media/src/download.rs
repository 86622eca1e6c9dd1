//! HTTP(S) media download.
//!
//! Responses are streamed to disk chunk by chunk. There are no retries: a
//! non-2xx status or a transport error fails the download and the partial
//! file is removed.

use futures::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_file_if_exists;

/// Default whole-request timeout.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of a finished download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadStats {
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Streams remote media to local files.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Create a downloader with a whole-request timeout.
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("recaps-render/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Download `url` into `dest`, replacing any existing file.
    pub async fn download(&self, url: &Url, dest: &Path) -> MediaResult<DownloadStats> {
        let started = Instant::now();
        match self.fetch(url, dest).await {
            Ok(bytes) => {
                let elapsed = started.elapsed();
                info!(
                    url = %redact(url),
                    bytes,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Download complete"
                );
                Ok(DownloadStats { bytes, elapsed })
            }
            Err(e) => {
                if let Err(cleanup) = remove_file_if_exists(dest).await {
                    debug!("Failed to remove partial download {}: {}", dest.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &Url, dest: &Path) -> MediaResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!(url = %redact(url), dest = %dest.display(), "Starting download");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MediaError::download_failed(redact(url), None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(
                redact(url),
                Some(status.as_u16()),
                format!("HTTP {}", status),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let data = chunk.map_err(|e| {
                MediaError::download_failed(redact(url), Some(status.as_u16()), e.to_string())
            })?;
            file.write_all(&data).await?;
            written += data.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

/// URL without its query string (signed URLs carry credentials there).
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn downloader() -> Downloader {
        Downloader::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_download_streams_body_to_file() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/bg/minecraft.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("bg.mp4");
        let url = Url::parse(&format!("{}/bg/minecraft.mp4", server.uri())).unwrap();

        let stats = downloader().download(&url, &dest).await.unwrap();
        assert_eq!(stats.bytes, body.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_http_error_is_fatal_and_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("voice.mp3");
        let url = Url::parse(&format!("{}/voice.mp3?token=secret", server.uri())).unwrap();

        let err = downloader().download(&url, &dest).await.unwrap_err();
        match err {
            MediaError::DownloadFailed { url, status, .. } => {
                assert_eq!(status, Some(404));
                assert!(!url.contains("secret"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_connection_error_has_no_status() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("voice.mp3");
        // Port 9 (discard) is closed on test machines
        let url = Url::parse("http://127.0.0.1:9/voice.mp3").unwrap();

        let err = downloader().download(&url, &dest).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { status: None, .. }));
        assert!(!dest.exists());
    }
}
