//! Media layer for recaps renders.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a cancellable runner
//! - Progress parsing from `-progress pipe:2`
//! - Caption chunking (precise and estimated timing) and SRT I/O
//! - Remote media download with a content-addressed background cache
//! - The vertical-video compositor

pub mod cache;
pub mod captions;
pub mod command;
pub mod compose;
pub mod download;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod resolver;
pub mod subtitles;

pub use cache::{cache_key, DiskVideoCache, VideoCache, DEFAULT_CACHE_TTL};
pub use captions::{CaptionChunker, CaptionConfig, CaptionStats, ChunkSizing, NO_TEXT_PLACEHOLDER};
pub use command::{FfmpegCommand, FfmpegRunner, ProcessOutput};
pub use compose::{CompositeOutput, CompositeRequest, Compositor, CompositorConfig};
pub use download::{DownloadStats, Downloader, DEFAULT_DOWNLOAD_TIMEOUT};
pub use error::{MediaError, MediaResult};
pub use filters::{AudioMix, Decoration, SubtitleStyle};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use resolver::{MediaKind, MediaOrigin, MediaResolver, ResolvedMedia};
pub use subtitles::{parse_srt, read_srt, to_srt, write_srt};
