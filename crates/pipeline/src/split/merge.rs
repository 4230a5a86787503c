use crate::Segment;

/// Thresholds for the validator/merger pass.
#[derive(Debug, Clone, Copy)]
pub struct MergeThresholds {
    /// Maximum character length of a merged segment.
    pub max_length: usize,
    /// Segments shorter than this are merge candidates.
    pub min_length: usize,
    /// Maximum duration of a merged segment in seconds.
    pub max_duration: f64,
    /// Segments shorter than this are merge candidates.
    pub min_duration: f64,
}

impl Default for MergeThresholds {
    fn default() -> Self {
        Self {
            max_length: 80,
            min_length: 10,
            max_duration: 10.0,
            min_duration: 1.0,
        }
    }
}

/// Merges too-short segments into their right neighbor where limits allow.
///
/// Single left-to-right fold: a segment that is short (by text or duration)
/// absorbs its successor when the combined text stays within `max_length`
/// and the combined span within `max_duration`; otherwise it is flushed
/// as-is. Overlong segments that arrive as a single piece pass through
/// untouched. The pass is stable and idempotent.
pub fn validate_and_merge(segments: Vec<Segment>, thresholds: &MergeThresholds) -> Vec<Segment> {
    let mut iter = segments.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut merged = Vec::new();

    for next in iter {
        let is_short = current.text.chars().count() < thresholds.min_length
            || current.duration() < thresholds.min_duration;

        let combined_len = current.text.chars().count() + 1 + next.text.chars().count();
        let combined_duration = next.end - current.start;

        let can_merge = combined_len <= thresholds.max_length
            && combined_duration <= thresholds.max_duration;

        if is_short && can_merge {
            current.text.push(' ');
            current.text.push_str(&next.text);
            current.end = next.end;
            current.timing = None;
        } else {
            merged.push(current);
            current = next;
        }
    }

    merged.push(current);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, start: f64, end: f64) -> Segment {
        Segment::new(text, start, end)
    }

    #[test]
    fn short_segment_merges_into_neighbor() {
        let segments = vec![seg("Ja.", 0.0, 0.4), seg("Genau das meinte ich.", 0.4, 2.0)];
        let merged = validate_and_merge(segments, &MergeThresholds::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Ja. Genau das meinte ich.");
        assert!((merged[0].start - 0.0).abs() < 1e-9);
        assert!((merged[0].end - 2.0).abs() < 1e-9);
    }

    #[test]
    fn long_enough_segments_are_left_alone() {
        let segments = vec![
            seg("Dieser Satz ist lang genug.", 0.0, 3.0),
            seg("Und dieser hier ebenfalls.", 3.0, 6.0),
        ];
        let merged = validate_and_merge(segments.clone(), &MergeThresholds::default());
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, segments[0].text);
    }

    #[test]
    fn merge_refused_when_combined_text_too_long() {
        let long_text = "x".repeat(79);
        let segments = vec![seg("Ja.", 0.0, 0.4), seg(&long_text, 0.4, 2.0)];
        let merged = validate_and_merge(segments, &MergeThresholds::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_refused_when_combined_span_too_long() {
        let segments = vec![seg("Ja.", 0.0, 0.4), seg("Viel später erst.", 10.8, 11.5)];
        let merged = validate_and_merge(segments, &MergeThresholds::default());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn overlong_single_segment_passes_through() {
        let long_text = "y".repeat(200);
        let segments = vec![seg(&long_text, 0.0, 5.0)];
        let merged = validate_and_merge(segments.clone(), &MergeThresholds::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, segments[0].text);
    }

    #[test]
    fn merging_is_idempotent() {
        let segments = vec![
            seg("Kurz.", 0.0, 0.3),
            seg("Auch kurz.", 0.3, 0.8),
            seg("Ein ordentlich langer Satz am Ende.", 0.8, 4.0),
        ];
        let once = validate_and_merge(segments, &MergeThresholds::default());
        let twice = validate_and_merge(once.clone(), &MergeThresholds::default());
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.start, b.start);
            assert_eq!(a.end, b.end);
        }
    }

    #[test]
    fn chained_short_segments_fold_left_to_right() {
        let segments = vec![
            seg("Eins.", 0.0, 0.3),
            seg("Zwei.", 0.3, 0.6),
            seg("Drei.", 0.6, 0.9),
        ];
        let merged = validate_and_merge(segments, &MergeThresholds::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Eins. Zwei. Drei.");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(validate_and_merge(Vec::new(), &MergeThresholds::default()).is_empty());
    }
}
