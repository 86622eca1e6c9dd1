//! Caption timing estimated from the script and the total duration.

use recaps_models::CaptionChunk;

use super::timing::{merge_degenerate, Draft};
use super::{CaptionConfig, NO_TEXT_PLACEHOLDER};

pub(super) fn chunk(config: &CaptionConfig, script: &str, duration: f64) -> Vec<CaptionChunk> {
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let words: Vec<&str> = script.split_whitespace().collect();

    if words.is_empty() {
        return vec![CaptionChunk::new(NO_TEXT_PLACEHOLDER, 0.0, duration)];
    }
    if duration <= 0.0 {
        return Vec::new();
    }

    let seconds_per_word = duration * config.pause_factor / words.len() as f64;

    let mut drafts = Vec::new();
    let mut position = 0.0;
    let mut index = 0;
    for size in config.sizing.plan(&words) {
        let speech = size as f64 * seconds_per_word;
        let display = (speech * config.extension_factor).clamp(config.min_duration, config.max_duration);

        let start = (position - config.lead_time).max(0.0);
        let end = (position + display - config.lead_time).min(duration);
        drafts.push(Draft::new(
            words[index..index + size].iter().map(|w| w.to_string()).collect(),
            start,
            end,
        ));

        index += size;
        position += speech;
    }

    let mut drafts = merge_degenerate(drafts, duration, config.min_duration);

    // Starts are strictly increasing and below `duration` here, so every
    // ceiling leaves room for a positive window.
    for i in 0..drafts.len() {
        let next_start = drafts.get(i + 1).map(|next| next.start);
        let ceiling = next_start.unwrap_or(duration);
        let draft = &mut drafts[i];

        if let Some(next_start) = next_start {
            if draft.end > next_start - config.gap {
                draft.end = next_start - config.gap;
            }
        }
        if draft.end - draft.start < config.reduced_min_duration {
            draft.end = (draft.start + config.reduced_min_duration).min(ceiling);
        }
    }

    drafts.into_iter().map(Draft::into_chunk).collect()
}
