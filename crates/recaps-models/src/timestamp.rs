//! SRT timestamp formatting and parsing.
//!
//! SRT uses `HH:MM:SS,mmm`. Formatting truncates fractional seconds to whole
//! milliseconds rather than rounding.

use thiserror::Error;

/// Error type for timestamp parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Timestamp is empty")]
    Empty,

    #[error("Invalid timestamp format: {0}")]
    InvalidFormat(String),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// Absorbs float representation error (0.57 * 1000 = 569.999…) before truncation.
const MS_EPSILON: f64 = 1e-6;

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// Negative and non-finite inputs format as zero.
///
/// # Examples
/// ```
/// use recaps_models::timestamp::format_srt_timestamp;
/// assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
/// assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
/// assert_eq!(format_srt_timestamp(1.9999), "00:00:01,999");
/// ```
pub fn format_srt_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let total_ms = (seconds * 1000.0 + MS_EPSILON).floor() as u64;

    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Parse an SRT timestamp (`HH:MM:SS,mmm`) into seconds.
///
/// A `.` millisecond separator is accepted too (WebVTT style).
pub fn parse_srt_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let (clock, millis) = ts
        .split_once(',')
        .or_else(|| ts.split_once('.'))
        .ok_or_else(|| TimestampError::InvalidFormat(ts.to_string()))?;

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    let hours: u64 = parts[0]
        .parse()
        .map_err(|_| TimestampError::InvalidValue("hours", parts[0].to_string()))?;
    let minutes: u64 = parts[1]
        .parse()
        .map_err(|_| TimestampError::InvalidValue("minutes", parts[1].to_string()))?;
    let seconds: u64 = parts[2]
        .parse()
        .map_err(|_| TimestampError::InvalidValue("seconds", parts[2].to_string()))?;
    if millis.len() != 3 {
        return Err(TimestampError::InvalidValue("milliseconds", millis.to_string()));
    }
    let millis: u64 = millis
        .parse()
        .map_err(|_| TimestampError::InvalidValue("milliseconds", millis.to_string()))?;

    if minutes >= 60 || seconds >= 60 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}
