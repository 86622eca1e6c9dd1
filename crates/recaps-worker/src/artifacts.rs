//! Per-job temporary files.

use std::path::PathBuf;
use tracing::debug;

use recaps_media::fs_utils::{remove_dir_if_exists, remove_file_if_exists};

/// Paths a render created and must delete when it ends.
#[derive(Debug, Default)]
pub struct TempArtifacts {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
    }

    /// Track a directory; it is removed recursively after all files.
    pub fn track_dir(&mut self, path: impl Into<PathBuf>) {
        self.dirs.push(path.into());
    }

    /// Delete everything, returning one warning per path that could not be
    /// removed. Missing paths are not warnings.
    pub async fn cleanup(self) -> Vec<String> {
        let mut warnings = Vec::new();

        for file in &self.files {
            if let Err(e) = remove_file_if_exists(file).await {
                warnings.push(format!("failed to remove {}: {}", file.display(), e));
            }
        }
        for dir in self.dirs.iter().rev() {
            if let Err(e) = remove_dir_if_exists(dir).await {
                warnings.push(format!("failed to remove {}: {}", dir.display(), e));
            }
        }

        debug!(
            files = self.files.len(),
            dirs = self.dirs.len(),
            warnings = warnings.len(),
            "Temporary artifacts cleaned up"
        );
        warnings
    }
}
