//! References to media inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Error type for media reference parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaRefError {
    #[error("Media reference is empty")]
    Empty,

    #[error("Invalid file URL: {0}")]
    InvalidFileUrl(String),
}

/// A background video or voice track: either already on disk or fetchable
/// over http(s).
///
/// Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaRef {
    Local(PathBuf),
    Remote(Url),
}

impl MediaRef {
    /// Parse a string into a media reference.
    ///
    /// `http`/`https` URLs are remote, `file://` URLs map to local paths and
    /// anything else (including Windows drive paths) is a local path.
    pub fn parse(value: &str) -> Result<Self, MediaRefError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(MediaRefError::Empty);
        }

        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| MediaRefError::InvalidFileUrl(value.to_string())),
            _ => Ok(Self::Local(PathBuf::from(value))),
        }
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn as_local(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }

    /// File extension hint (from the path or the URL path), lowercased.
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            Self::Local(path) => path.clone(),
            Self::Remote(url) => PathBuf::from(url.path()),
        };
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Redacted form for logs: URLs lose their query string (signed tokens).
    pub fn redacted(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => {
                let mut url = url.clone();
                url.set_query(None);
                url.to_string()
            }
        }
    }
}

impl TryFrom<String> for MediaRef {
    type Error = MediaRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MediaRef> for String {
    fn from(value: MediaRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let media = MediaRef::parse("https://cdn.example.com/bg/minecraft_1.mp4?token=abc").unwrap();
        assert!(media.is_remote());
        assert_eq!(media.extension().as_deref(), Some("mp4"));
        assert_eq!(media.redacted(), "https://cdn.example.com/bg/minecraft_1.mp4");
    }

    #[test]
    fn test_parse_local_paths() {
        assert_eq!(
            MediaRef::parse("/tmp/voice.mp3").unwrap(),
            MediaRef::Local(PathBuf::from("/tmp/voice.mp3"))
        );
        assert_eq!(
            MediaRef::parse("relative/bg.mp4").unwrap(),
            MediaRef::Local(PathBuf::from("relative/bg.mp4"))
        );
        // A drive letter parses as a URL scheme but is still a path
        assert!(!MediaRef::parse("C:\\videos\\bg.mp4").unwrap().is_remote());
    }

    #[test]
    fn test_parse_file_url() {
        let media = MediaRef::parse("file:///tmp/bg.mp4").unwrap();
        assert_eq!(media.as_local(), Some(Path::new("/tmp/bg.mp4")));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(MediaRef::parse("   "), Err(MediaRefError::Empty));
    }

    #[test]
    fn test_serde_as_string() {
        let media: MediaRef = serde_json::from_str("\"http://localhost:3000/voice.mp3\"").unwrap();
        assert!(media.is_remote());
        let json = serde_json::to_string(&media).unwrap();
        assert_eq!(json, "\"http://localhost:3000/voice.mp3\"");
    }
}
