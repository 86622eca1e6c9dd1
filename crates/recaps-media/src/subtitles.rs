//! SRT serialization.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use recaps_models::{format_srt_timestamp, parse_srt_timestamp, CaptionChunk};

use crate::error::{MediaError, MediaResult};

/// Render captions as SRT.
///
/// Entries are numbered from 1 and separated by a blank line.
pub fn to_srt(chunks: &[CaptionChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_srt_timestamp(chunk.start_time),
                format_srt_timestamp(chunk.end_time),
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write captions to an SRT file.
pub async fn write_srt(chunks: &[CaptionChunk], path: impl AsRef<Path>) -> MediaResult<()> {
    let path = path.as_ref();
    tokio::fs::write(path, to_srt(chunks)).await?;
    debug!(
        "Wrote {} captions to {}",
        chunks.len(),
        path.display()
    );
    Ok(())
}

fn block_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\n[ \t]*\r?\n").expect("valid regex"))
}

fn timing_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d+:\d{2}:\d{2}[,.]\d{3})").expect("valid regex")
    })
}

/// Parse SRT content back into captions.
///
/// Blocks must carry an index line, a timing line and at least one text
/// line (multi-line text is joined with `\n`).
pub fn parse_srt(content: &str) -> MediaResult<Vec<CaptionChunk>> {
    let content = content.trim_start_matches('\u{feff}').trim();
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    for (n, block) in block_separator().split(content).enumerate() {
        let block_no = n + 1;
        let mut lines = block.lines().map(str::trim_end).filter(|l| !l.trim().is_empty());

        let index = lines
            .next()
            .ok_or_else(|| MediaError::invalid_subtitle(format!("block {} is empty", block_no)))?;
        if index.trim().parse::<usize>().is_err() {
            return Err(MediaError::invalid_subtitle(format!(
                "block {} has invalid index '{}'",
                block_no, index
            )));
        }

        let timing = lines.next().ok_or_else(|| {
            MediaError::invalid_subtitle(format!("block {} is missing its timing line", block_no))
        })?;
        let caps = timing_line().captures(timing).ok_or_else(|| {
            MediaError::invalid_subtitle(format!(
                "block {} has invalid timing line '{}'",
                block_no, timing
            ))
        })?;

        let parse = |ts: &str| {
            parse_srt_timestamp(ts).map_err(|e| {
                MediaError::invalid_subtitle(format!("block {}: {}", block_no, e))
            })
        };
        let start = parse(&caps[1])?;
        let end = parse(&caps[2])?;

        let text = lines.collect::<Vec<_>>().join("\n");
        if text.is_empty() {
            return Err(MediaError::invalid_subtitle(format!(
                "block {} has no text",
                block_no
            )));
        }

        chunks.push(CaptionChunk::new(text, start, end));
    }

    Ok(chunks)
}

/// Read and parse an SRT file.
pub async fn read_srt(path: impl AsRef<Path>) -> MediaResult<Vec<CaptionChunk>> {
    let content = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_srt(&content)
}
