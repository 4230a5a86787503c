use serde::Serialize;

use crate::Segment;

/// Formats seconds as an SRT timestamp `HH:MM:SS,mmm`.
///
/// Milliseconds are floored, not rounded, so a formatted value never points
/// past the real instant.
pub fn format_timestamp(seconds: f64) -> String {
    let whole = seconds as i64;
    let millis = ((seconds - whole as f64) * 1000.0) as i64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Renders segments as numbered SRT entries separated by blank lines.
pub fn generate_srt(segments: &[Segment]) -> String {
    let entries: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(seg.start),
                format_timestamp(seg.end),
                seg.text
            )
        })
        .collect();
    entries.join("\n")
}

#[derive(Serialize)]
struct JsonSegment<'a> {
    start: f64,
    end: f64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
}

/// Renders segments as a JSON array, with an empty `translation` placeholder
/// per entry when a target language is configured.
pub fn generate_json(segments: &[Segment], target_language: Option<&str>) -> String {
    let items: Vec<JsonSegment<'_>> = segments
        .iter()
        .map(|seg| JsonSegment {
            start: seg.start,
            end: seg.end,
            text: &seg.text,
            translation: target_language.map(|_| ""),
        })
        .collect();
    serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
}

/// A subtitle entry parsed back from SRT text.
#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Parses SRT content into entries. Malformed blocks are skipped.
pub fn parse_srt(content: &str) -> Vec<SrtEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines().peekable();

    while lines.peek().is_some() {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }

        let Some(index_line) = lines.next() else { break };
        let Ok(index) = index_line.trim().parse::<usize>() else {
            continue;
        };

        let Some(ts_line) = lines.next() else { break };
        let Some((start_secs, end_secs)) = parse_timestamp_line(ts_line.trim()) else {
            continue;
        };

        let mut text_parts = Vec::new();
        while lines.peek().is_some_and(|l| !l.trim().is_empty()) {
            text_parts.push(lines.next().unwrap().trim().to_string());
        }

        entries.push(SrtEntry {
            index,
            start_secs,
            end_secs,
            text: text_parts.join(" "),
        });
    }

    entries
}

/// Parses a line like `00:00:02,965 --> 00:00:04,277`.
fn parse_timestamp_line(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((parse_srt_time(start.trim())?, parse_srt_time(end.trim())?))
}

/// Parses `HH:MM:SS,mmm` (or a dot separator) into seconds.
fn parse_srt_time(s: &str) -> Option<f64> {
    let s = s.replace(',', ".");
    let mut parts = s.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_formatting() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(1.25), "00:00:01,250");
        assert_eq!(format_timestamp(90.5), "00:01:30,500");
        assert_eq!(format_timestamp(3661.001), "01:01:01,001");
        // Floored, never rounded up.
        assert_eq!(format_timestamp(2.9999), "00:00:02,999");
    }

    #[test]
    fn srt_time_parsing() {
        assert!((parse_srt_time("00:00:02,965").unwrap() - 2.965).abs() < 0.001);
        assert!((parse_srt_time("00:01:30.500").unwrap() - 90.5).abs() < 0.001);
        assert!((parse_srt_time("01:00:00,000").unwrap() - 3600.0).abs() < 0.001);
        assert!(parse_srt_time("not a time").is_none());
    }

    #[test]
    fn srt_layout_is_numbered_with_blank_separators() {
        let segments = vec![
            Segment::new("Hallo Welt.", 0.0, 1.25),
            Segment::new("Wie geht es dir?", 1.25, 3.0),
        ];
        let srt = generate_srt(&segments);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,250\nHallo Welt.\n\n\
             2\n00:00:01,250 --> 00:00:03,000\nWie geht es dir?\n"
        );
    }

    #[test]
    fn srt_round_trips_within_a_millisecond() {
        let segments = vec![
            Segment::new("Erstens.", 0.117, 1.934),
            Segment::new("Zweitens, mit Komma.", 2.0005, 4.25),
            Segment::new("Drittens — Sonderzeichen üöä.", 4.4, 9.999),
        ];
        let parsed = parse_srt(&generate_srt(&segments));
        assert_eq!(parsed.len(), segments.len());
        for (entry, seg) in parsed.iter().zip(segments.iter()) {
            assert!((entry.start_secs - seg.start).abs() < 0.001 + 1e-9);
            assert!((entry.end_secs - seg.end).abs() < 0.001 + 1e-9);
            assert_eq!(entry.text, seg.text);
        }
        assert_eq!(parsed[0].index, 1);
        assert_eq!(parsed[2].index, 3);
    }

    #[test]
    fn json_includes_translation_only_with_target_language() {
        let segments = vec![Segment::new("Hallo.", 0.0, 1.0)];

        let with = generate_json(&segments, Some("de"));
        let value: serde_json::Value = serde_json::from_str(&with).unwrap();
        assert_eq!(value[0]["translation"], "");
        assert_eq!(value[0]["text"], "Hallo.");

        let without = generate_json(&segments, None);
        let value: serde_json::Value = serde_json::from_str(&without).unwrap();
        assert!(value[0].get("translation").is_none());
    }

    #[test]
    fn json_preserves_utf8() {
        let segments = vec![Segment::new("Größe: ändern & prüfen", 0.0, 1.0)];
        let json = generate_json(&segments, None);
        assert!(json.contains("Größe: ändern & prüfen"));
    }
}
