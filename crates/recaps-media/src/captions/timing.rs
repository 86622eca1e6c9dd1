//! Helpers shared by both timing modes.

use recaps_models::CaptionChunk;

/// A caption under construction.
#[derive(Debug, Clone)]
pub(super) struct Draft {
    pub words: Vec<String>,
    pub start: f64,
    pub end: f64,
}

impl Draft {
    pub fn new(words: Vec<String>, start: f64, end: f64) -> Self {
        Self { words, start, end }
    }

    fn absorb(&mut self, other: Draft) {
        self.words.extend(other.words);
        self.end = self.end.max(other.end);
    }

    pub fn into_chunk(self) -> CaptionChunk {
        CaptionChunk::new(self.words.join(" ").to_uppercase(), self.start, self.end)
    }
}

pub(super) fn clamp_time(value: f64, total: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, total)
    } else {
        0.0
    }
}

/// Merge drafts that cannot get a positive display window.
///
/// After this pass, starts are strictly increasing and the last start is
/// before `total`, so every draft has room to end after it starts.
pub(super) fn merge_degenerate(drafts: Vec<Draft>, total: f64, min_duration: f64) -> Vec<Draft> {
    let mut merged: Vec<Draft> = Vec::with_capacity(drafts.len());

    for draft in drafts {
        match merged.last_mut() {
            Some(prev) if draft.start <= prev.start || draft.start >= total => prev.absorb(draft),
            _ => merged.push(draft),
        }
    }

    // Everything landed on the end of the video
    if let [only] = merged.as_mut_slice() {
        if only.start >= total {
            only.start = (total - min_duration).max(0.0);
        }
    }

    merged
}

/// Latest end for the draft at `index`: the next start minus `gap`, or the
/// next start itself when the gap does not fit, or `total` for the last one.
pub(super) fn ceiling(drafts: &[Draft], index: usize, gap: f64, total: f64) -> f64 {
    match drafts.get(index + 1) {
        Some(next) => {
            let with_gap = next.start - gap;
            if with_gap > drafts[index].start {
                with_gap
            } else {
                next.start
            }
        }
        None => total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(word: &str, start: f64, end: f64) -> Draft {
        Draft::new(vec![word.to_string()], start, end)
    }

    #[test]
    fn test_merge_shared_start() {
        let drafts = vec![draft("a", 1.0, 1.0), draft("b", 1.0, 1.5), draft("c", 2.0, 2.5)];
        let merged = merge_degenerate(drafts, 10.0, 3.5);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].words, vec!["a", "b"]);
        assert_eq!(merged[0].end, 1.5);
    }

    #[test]
    fn test_merge_into_previous_at_end() {
        let drafts = vec![draft("a", 4.0, 5.0), draft("b", 5.0, 5.0)];
        let merged = merge_degenerate(drafts, 5.0, 3.5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].clone().into_chunk().text, "A B");
    }

    #[test]
    fn test_lone_draft_at_end_moves_back() {
        let merged = merge_degenerate(vec![draft("late", 5.0, 5.0)], 5.0, 3.5);
        assert!((merged[0].start - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_ceiling_drops_gap_when_tight() {
        let drafts = vec![draft("a", 1.0, 1.2), draft("b", 1.05, 1.5)];
        assert_eq!(ceiling(&drafts, 0, 0.1, 10.0), 1.05);
        assert_eq!(ceiling(&drafts, 1, 0.1, 10.0), 10.0);
    }
}
