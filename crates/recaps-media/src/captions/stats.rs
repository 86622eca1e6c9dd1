//! Summary statistics over a caption track.

use serde::Serialize;

use recaps_models::CaptionChunk;

/// Timing report for a list of captions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionStats {
    pub count: usize,
    pub average_duration: f64,
    pub total_caption_time: f64,
    /// Caption time as a percentage of the video duration
    pub coverage_percent: f64,
    /// Consecutive pairs with idle time between them
    pub gaps: usize,
    /// Consecutive pairs that overlap (always 0 for chunker output)
    pub overlaps: usize,
}

impl CaptionStats {
    pub fn from_chunks(chunks: &[CaptionChunk], video_duration: f64) -> Self {
        let total_caption_time: f64 = chunks.iter().map(CaptionChunk::duration).sum();
        let average_duration = if chunks.is_empty() {
            0.0
        } else {
            total_caption_time / chunks.len() as f64
        };
        let coverage_percent = if video_duration > 0.0 {
            total_caption_time / video_duration * 100.0
        } else {
            0.0
        };

        let mut gaps = 0;
        let mut overlaps = 0;
        for pair in chunks.windows(2) {
            if pair[0].end_time < pair[1].start_time {
                gaps += 1;
            } else if pair[0].end_time > pair[1].start_time {
                overlaps += 1;
            }
        }

        Self {
            count: chunks.len(),
            average_duration,
            total_caption_time,
            coverage_percent,
            gaps,
            overlaps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let chunks = vec![
            CaptionChunk::new("ONE", 0.0, 2.0),
            CaptionChunk::new("TWO", 2.5, 4.0),
            CaptionChunk::new("THREE", 3.5, 5.0),
        ];
        let stats = CaptionStats::from_chunks(&chunks, 10.0);

        assert_eq!(stats.count, 3);
        assert!((stats.total_caption_time - 5.0).abs() < 1e-9);
        assert!((stats.coverage_percent - 50.0).abs() < 1e-9);
        assert_eq!(stats.gaps, 1);
        assert_eq!(stats.overlaps, 1);
    }

    #[test]
    fn test_empty() {
        let stats = CaptionStats::from_chunks(&[], 10.0);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_duration, 0.0);
    }
}
