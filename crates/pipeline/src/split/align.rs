use tracing::warn;

use crate::Segment;

/// Gap above which a token is treated as starting after silence rather than
/// flush against its predecessor.
const SILENCE_GAP_SECS: f64 = 1.0;

/// Assumed maximum length of a token that follows silence (or opens the
/// stream).
const TOKEN_LEAD_SECS: f64 = 0.5;

/// Timing placed on a piece that cannot be located in the token stream.
const MISS_FALLBACK_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
struct TokenWindow {
    start: f64,
    end: f64,
}

/// Reconstructs per-token `[start, end]` windows from end times.
///
/// `end_times[i]` is the END of token i. The start is the previous token's
/// end, except for the first token and after a silence gap (> 1 s), where the
/// token is assumed to be at most 0.5 s long. Windows are clamped monotone.
fn token_windows(end_times: &[f64]) -> Option<Vec<TokenWindow>> {
    let mut windows = Vec::with_capacity(end_times.len());
    let mut prev_end = 0.0f64;

    for (idx, &end_time) in end_times.iter().enumerate() {
        if !end_time.is_finite() {
            warn!("Non-finite timestamp at token {idx}, falling back to proportional timing");
            return None;
        }

        let mut start = if idx == 0 {
            (end_time - TOKEN_LEAD_SECS).max(0.0)
        } else if end_time - prev_end > SILENCE_GAP_SECS {
            (end_time - TOKEN_LEAD_SECS).max(prev_end)
        } else {
            prev_end
        };

        if start < prev_end {
            start = prev_end;
        }
        let end = end_time.max(start);

        windows.push(TokenWindow { start, end });
        prev_end = end;
    }

    Some(windows)
}

fn normalize_char(c: char) -> Option<char> {
    c.is_alphanumeric().then(|| c.to_lowercase().next().unwrap_or(c))
}

/// Aligns re-segmented text pieces with the original token timing.
///
/// Both the concatenated token text and each piece are projected to
/// lowercase alphanumeric characters, which makes the match robust against
/// punctuation and whitespace the splitters (or the LLM) moved around. Each
/// hit maps back through the char→token table to the timing of its first and
/// last token. Returns `None` when the timing data is unusable; the caller
/// then interpolates proportionally.
pub fn align_with_tokens(
    parts: &[String],
    tokens: &[String],
    end_times: &[f64],
    joiner: &str,
) -> Option<Vec<Segment>> {
    if tokens.is_empty() || end_times.is_empty() || tokens.len() != end_times.len() {
        warn!("Invalid tokens/timestamps for alignment, falling back to proportional timing");
        return None;
    }

    let windows = token_windows(end_times)?;

    // Concatenated text plus a total char→token table. Joiner characters map
    // to the preceding token; they are never dereferenced because only
    // alphanumeric positions survive normalization.
    let mut full_text = String::new();
    let mut char_to_token: Vec<usize> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            for _ in joiner.chars() {
                char_to_token.push(idx - 1);
            }
            full_text.push_str(joiner);
        }
        for _ in token.chars() {
            char_to_token.push(idx);
        }
        full_text.push_str(token);
    }

    if full_text.is_empty() {
        warn!("Tokenizer produced empty text, falling back to proportional timing");
        return None;
    }

    // Normalized projection and its map back to original char indices.
    let mut normalized = String::new();
    let mut norm_to_orig: Vec<usize> = Vec::new();
    for (i, c) in full_text.chars().enumerate() {
        if let Some(n) = normalize_char(c) {
            normalized.push(n);
            norm_to_orig.push(i);
        }
    }

    let norm_chars: Vec<char> = normalized.chars().collect();
    let mut aligned: Vec<Segment> = Vec::new();
    let mut search_pos = 0usize;

    for part in parts {
        let part_norm: Vec<char> = part.chars().filter_map(normalize_char).collect();
        if part_norm.is_empty() {
            continue;
        }

        let match_start = find_subsequence(&norm_chars, &part_norm, search_pos)
            .or_else(|| find_subsequence(&norm_chars, &part_norm, 0));

        let Some(match_start) = match_start else {
            // Piece not present in the token stream (heavy LLM rewrite):
            // pin it right after the previous piece.
            let start = aligned.last().map(|s| s.end).unwrap_or(0.0);
            aligned.push(Segment::new(part.clone(), start, start + MISS_FALLBACK_SECS));
            continue;
        };

        let match_end = match_start + part_norm.len();

        let start_token = char_to_token[norm_to_orig[match_start]];
        let end_token = char_to_token[norm_to_orig[match_end - 1]];

        let start = windows[start_token].start;
        let end = windows[end_token].end.max(start);

        aligned.push(Segment::new(part.clone(), start, end));
        search_pos = match_end;
    }

    Some(aligned)
}

/// First occurrence of `needle` in `haystack` at or after `from`.
fn find_subsequence(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

/// Distributes a segment's duration over its pieces by character share.
pub fn interpolate_proportionally(parts: &[String], start: f64, end: f64) -> Vec<Segment> {
    let duration = end - start;
    let total_chars: usize = parts.iter().map(|p| p.chars().count()).sum();

    let mut segments = Vec::with_capacity(parts.len());
    let mut current_start = start;

    for part in parts {
        let share = if total_chars > 0 {
            part.chars().count() as f64 / total_chars as f64 * duration
        } else {
            0.0
        };
        segments.push(Segment::new(part.clone(), current_start, current_start + share));
        current_start += share;
    }

    segments
}
