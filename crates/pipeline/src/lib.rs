pub mod asr;
pub mod audio;
pub mod clean;
pub mod llm;
pub mod nlp;
pub mod split;
pub mod subtitle;
pub mod tts;

use serde::{Deserialize, Serialize};

/// Raw recognizer output for a whole input, stitched across chunks.
///
/// `end_times[i]` is the end time of `tokens[i]` in seconds relative to the
/// concatenated input; the list is monotonically non-decreasing and always
/// matches `tokens` in length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTranscript {
    pub text: String,
    pub tokens: Vec<String>,
    pub end_times: Vec<f64>,
}

/// Per-token timing carried by a segment between the silence pre-split and
/// the aligner. Dropped once segments are refined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTiming {
    pub tokens: Vec<String>,
    pub end_times: Vec<f64>,
}

/// A subtitle unit.
///
/// `end` may overlap the successor's `start` by up to 150 ms: segment ends
/// are deliberately extended so playback does not cut off the last word.
/// Consumers that need disjoint timing clamp on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(flatten)]
    pub timing: Option<TokenTiming>,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            timing: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
