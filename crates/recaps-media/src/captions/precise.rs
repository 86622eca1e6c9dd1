//! Caption timing from per-word timestamps.

use recaps_models::{CaptionChunk, WordTimestamp};

use super::timing::{ceiling, clamp_time, merge_degenerate, Draft};
use super::CaptionConfig;

pub(super) fn chunk(
    config: &CaptionConfig,
    words: &[WordTimestamp],
    total_duration: f64,
) -> Vec<CaptionChunk> {
    let words: Vec<&WordTimestamp> = words.iter().filter(|w| !w.word.trim().is_empty()).collect();
    if words.is_empty() {
        return Vec::new();
    }

    let total = if total_duration.is_finite() && total_duration > 0.0 {
        total_duration
    } else {
        words.iter().map(|w| w.end_time).fold(0.0, f64::max)
    };
    if total <= 0.0 {
        return Vec::new();
    }

    let texts: Vec<&str> = words.iter().map(|w| w.word.trim()).collect();
    let mut drafts = Vec::new();
    let mut index = 0;
    for size in config.sizing.plan(&texts) {
        let group = &words[index..index + size];
        let start = clamp_time(group[0].start_time, total);
        let end = clamp_time(group[size - 1].end_time, total);
        drafts.push(Draft::new(
            texts[index..index + size].iter().map(|t| t.to_string()).collect(),
            start,
            end,
        ));
        index += size;
    }

    let mut drafts = merge_degenerate(drafts, total, config.min_duration);

    for i in 0..drafts.len() {
        let limit = ceiling(&drafts, i, config.gap, total);
        let draft = &mut drafts[i];

        let mut end = draft.end.min(limit);
        if end - draft.start < config.min_duration {
            end = (draft.start + config.min_duration).min(limit);
        }
        if end - draft.start > config.max_duration {
            end = draft.start + config.max_duration;
        }
        draft.end = end;
    }

    for i in 0..drafts.len().saturating_sub(1) {
        let limit = ceiling(&drafts, i, config.gap, total);
        if drafts[i].end > limit {
            drafts[i].end = limit;
        }
    }

    drafts.into_iter().map(Draft::into_chunk).collect()
}
