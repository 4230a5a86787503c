use crate::{RawTranscript, Segment, TokenTiming};

/// Token-time gap that closes a segment.
const SILENCE_GAP_SECS: f64 = 2.0;

/// Lead-in subtracted from the first token's end time when estimating a
/// segment start.
const START_LEAD_SECS: f64 = 0.5;

/// Splits a raw transcript into segments at silence gaps.
///
/// Token end-times only mark ends, so a gap before a token shows up as a
/// jump between consecutive end times; anything above 2 s closes the
/// current segment. Each segment keeps its token slice for the aligner.
///
/// Without usable token timing a single segment spanning `[0, duration]` is
/// synthesized from the full text.
pub fn presplit_by_silence(transcript: &RawTranscript, duration: f64) -> Vec<Segment> {
    let usable = !transcript.tokens.is_empty()
        && transcript.tokens.len() == transcript.end_times.len();

    if !usable {
        return vec![Segment::new(transcript.text.clone(), 0.0, duration)];
    }

    let mut segments = Vec::new();
    let mut current_tokens: Vec<String> = Vec::new();
    let mut current_times: Vec<f64> = Vec::new();
    let mut last_end = 0.0f64;

    let flush = |tokens: &mut Vec<String>, times: &mut Vec<f64>, segments: &mut Vec<Segment>| {
        if tokens.is_empty() {
            return;
        }
        let first = times[0];
        let start = if first > START_LEAD_SECS {
            first - START_LEAD_SECS
        } else {
            0.0
        };
        let end = *times.last().unwrap();
        segments.push(Segment {
            text: tokens.concat(),
            start,
            end,
            timing: Some(TokenTiming {
                tokens: std::mem::take(tokens),
                end_times: std::mem::take(times),
            }),
        });
    };

    for (i, (token, &end)) in transcript
        .tokens
        .iter()
        .zip(transcript.end_times.iter())
        .enumerate()
    {
        if i > 0 && end - last_end > SILENCE_GAP_SECS {
            flush(&mut current_tokens, &mut current_times, &mut segments);
        }
        current_tokens.push(token.clone());
        current_times.push(end);
        last_end = end;
    }
    flush(&mut current_tokens, &mut current_times, &mut segments);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(tokens: &[&str], end_times: &[f64]) -> RawTranscript {
        RawTranscript {
            text: tokens.concat(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            end_times: end_times.to_vec(),
        }
    }

    #[test]
    fn splits_at_large_gap() {
        // Gap of 3.8 s between the second and third token.
        let t = transcript(&["A", "B", "C", "D"], &[1.0, 1.2, 5.0, 5.2]);
        let segments = presplit_by_silence(&t, 6.0);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "AB");
        assert!((segments[0].start - 0.5).abs() < 1e-9);
        assert!((segments[0].end - 1.2).abs() < 1e-9);
        assert!((segments[1].start - 4.5).abs() < 1e-9);
        assert!((segments[1].end - 5.2).abs() < 1e-9);
    }

    #[test]
    fn token_union_is_preserved_in_order() {
        let t = transcript(&["A", "B", "C", "D", "E"], &[0.5, 1.0, 4.0, 4.5, 9.0]);
        let segments = presplit_by_silence(&t, 10.0);

        let collected: Vec<String> = segments
            .iter()
            .flat_map(|s| s.timing.as_ref().unwrap().tokens.clone())
            .collect();
        assert_eq!(collected, t.tokens);

        let times: Vec<f64> = segments
            .iter()
            .flat_map(|s| s.timing.as_ref().unwrap().end_times.clone())
            .collect();
        assert_eq!(times, t.end_times);
    }

    #[test]
    fn first_token_near_zero_clamps_start() {
        let t = transcript(&["Hallo", " Welt", "."], &[0.5, 1.0, 1.1]);
        let segments = presplit_by_silence(&t, 5.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hallo Welt.");
        assert!((segments[0].start - 0.0).abs() < 1e-9);
        assert!((segments[0].end - 1.1).abs() < 1e-9);
    }

    #[test]
    fn empty_tokens_synthesize_single_segment() {
        let t = RawTranscript {
            text: "nur text".to_string(),
            tokens: Vec::new(),
            end_times: Vec::new(),
        };
        let segments = presplit_by_silence(&t, 12.5);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "nur text");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].end, 12.5);
        assert!(segments[0].timing.is_none());
    }

    #[test]
    fn no_gap_means_single_segment() {
        let t = transcript(&["a", "b", "c"], &[0.5, 1.0, 1.5]);
        let segments = presplit_by_silence(&t, 2.0);
        assert_eq!(segments.len(), 1);
    }
}
