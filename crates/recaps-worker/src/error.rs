//! Render error types.

use thiserror::Error;

use recaps_media::MediaError;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Download failed for {url}: {message}")]
    Download {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Caption generation failed: {0}")]
    CaptionGeneration(String),

    #[error("Compositor failed: {message}")]
    Compositor {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Render timed out after {0} seconds")]
    Timeout(u64),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for RenderError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::DownloadFailed {
                url,
                status,
                message,
            } => Self::Download {
                url,
                status,
                message,
            },
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => Self::Compositor {
                message,
                stderr: stderr.unwrap_or_default(),
                exit_code,
            },
            MediaError::FileNotFound(path) => {
                Self::InvalidJob(format!("input file not found: {}", path.display()))
            }
            MediaError::Cancelled => Self::Cancelled,
            MediaError::Timeout(secs) => Self::Timeout(secs),
            MediaError::Io(e) => Self::Io(e),
            other => Self::Media(other),
        }
    }
}

impl RenderError {
    pub fn caption_generation(msg: impl Into<String>) -> Self {
        Self::CaptionGeneration(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Download { .. } => "download",
            RenderError::CaptionGeneration(_) => "caption_generation",
            RenderError::Compositor { .. } => "compositor",
            RenderError::InvalidJob(_) => "invalid_job",
            RenderError::Config(_) => "config",
            RenderError::Cancelled => "cancelled",
            RenderError::Timeout(_) => "timeout",
            RenderError::Media(_) => "media",
            RenderError::Io(_) => "io",
        }
    }

    /// Captured FFmpeg stderr, if the compositor failed.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            RenderError::Compositor { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
