use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::RawTranscript;
use crate::audio::{read_wav_samples, resample_linear};

use super::{AsrError, Recognizer};

const TARGET_SAMPLE_RATE: u32 = 16000;
/// Chunks shorter than this are dropped rather than recognized.
const MIN_CHUNK_SECS: f64 = 0.1;

/// Finds sample indices to split audio at silence points near chunk
/// boundaries.
///
/// For each boundary the window `[0.75·chunk, 1.25·chunk]` past the previous
/// cut is scanned in non-overlapping 0.1 s sub-windows; the cut lands at the
/// midpoint of the sub-window with the smallest peak amplitude, or at the far
/// end of the window when it is too small to hold a sub-window. The result
/// always starts at 0, ends at `audio.len()`, and is strictly increasing.
pub fn find_split_points(audio: &[f32], sample_rate: u32, chunk_duration_secs: u32) -> Vec<usize> {
    let total_samples = audio.len();
    let chunk_samples = (chunk_duration_secs as usize) * (sample_rate as usize);

    let mut split_points = vec![0usize];
    let mut current_start = 0usize;

    while current_start + chunk_samples < total_samples {
        let search_start = current_start + (chunk_samples as f64 * 0.75) as usize;
        let search_end = (current_start + (chunk_samples as f64 * 1.25) as usize).min(total_samples);

        if search_start >= total_samples {
            break;
        }

        let segment = &audio[search_start..search_end];
        if segment.is_empty() {
            break;
        }

        let window_size = (0.1 * sample_rate as f64) as usize;
        let num_windows = segment.len() / window_size;

        let split_idx = if num_windows == 0 {
            search_end
        } else {
            let (min_idx, _) = segment
                .chunks_exact(window_size)
                .map(|window| window.iter().fold(0.0f32, |peak, &s| peak.max(s.abs())))
                .enumerate()
                .fold((0usize, f32::MAX), |(best_i, best_peak), (i, peak)| {
                    if peak < best_peak { (i, peak) } else { (best_i, best_peak) }
                });
            search_start + min_idx * window_size + window_size / 2
        };

        split_points.push(split_idx);
        current_start = split_idx;
    }

    split_points.push(total_samples);
    split_points.sort_unstable();
    split_points.dedup();
    split_points
}

/// Drives the recognizer over a normalized WAV, chunking long audio at
/// silence points and stitching the per-chunk output back together.
pub struct ChunkedAsrDriver {
    recognizer: Arc<dyn Recognizer>,
    chunk_duration_secs: u32,
}

impl ChunkedAsrDriver {
    pub fn new(recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            recognizer,
            chunk_duration_secs: 60,
        }
    }

    /// Loads the waveform and produces a [`RawTranscript`].
    ///
    /// Fails as a whole if the recognizer fails on any chunk; no partial
    /// transcript is ever returned.
    pub fn transcribe_file(&self, path: &Path) -> Result<RawTranscript, AsrError> {
        let (samples, sample_rate) = read_wav_samples(path)?;

        if samples.is_empty() {
            return Err(AsrError::NoSamples);
        }

        let samples = if sample_rate != TARGET_SAMPLE_RATE {
            info!("Resampling audio from {sample_rate}Hz to {TARGET_SAMPLE_RATE}Hz");
            resample_linear(&samples, sample_rate, TARGET_SAMPLE_RATE)
        } else {
            samples
        };

        self.transcribe_samples(&samples)
    }

    pub fn transcribe_samples(&self, samples: &[f32]) -> Result<RawTranscript, AsrError> {
        if samples.is_empty() {
            return Err(AsrError::NoSamples);
        }

        let rate = TARGET_SAMPLE_RATE;
        let duration = samples.len() as f64 / rate as f64;

        if duration <= self.chunk_duration_secs as f64 {
            let output = self.recognizer.transcribe(samples, rate)?;
            return Ok(RawTranscript {
                text: output.text,
                tokens: output.tokens,
                end_times: output.end_times,
            });
        }

        info!(duration_secs = duration, "Long audio, using chunked recognition");
        let split_points = find_split_points(samples, rate, self.chunk_duration_secs);

        let mut text_parts: Vec<String> = Vec::new();
        let mut tokens = Vec::new();
        let mut end_times = Vec::new();

        let min_chunk_samples = (MIN_CHUNK_SECS * rate as f64) as usize;

        for (i, pair) in split_points.windows(2).enumerate() {
            let (start_idx, end_idx) = (pair[0], pair[1]);
            let chunk = &samples[start_idx..end_idx];

            if chunk.len() < min_chunk_samples {
                continue;
            }

            debug!(
                chunk = i + 1,
                total = split_points.len() - 1,
                secs = chunk.len() as f64 / rate as f64,
                "Recognizing chunk"
            );

            let output = self.recognizer.transcribe(chunk, rate)?;

            if !output.text.is_empty() {
                text_parts.push(output.text);
            }

            let time_offset = start_idx as f64 / rate as f64;
            end_times.extend(output.end_times.iter().map(|t| t + time_offset));
            tokens.extend(output.tokens);
        }

        Ok(RawTranscript {
            text: text_parts.join(" "),
            tokens,
            end_times,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::RecognizerOutput;

    /// Emits one fixed token per invocation, with an end time relative to
    /// the chunk start.
    struct MockRecognizer;

    impl Recognizer for MockRecognizer {
        fn transcribe(
            &self,
            samples: &[f32],
            sample_rate: u32,
        ) -> Result<RecognizerOutput, AsrError> {
            let secs = samples.len() as f64 / sample_rate as f64;
            Ok(RecognizerOutput {
                text: "chunk".to_string(),
                tokens: vec!["chunk".to_string()],
                end_times: vec![secs / 2.0],
            })
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    struct FailingRecognizer;

    impl Recognizer for FailingRecognizer {
        fn transcribe(&self, _: &[f32], _: u32) -> Result<RecognizerOutput, AsrError> {
            Err(AsrError::Recognizer("boom".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn sine_with_silence(total_secs: f64, silence_start: f64, silence_end: f64) -> Vec<f32> {
        let rate = 16000usize;
        (0..(total_secs * rate as f64) as usize)
            .map(|i| {
                let t = i as f64 / rate as f64;
                if t >= silence_start && t < silence_end {
                    0.0
                } else {
                    (0.5 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as f32
                }
            })
            .collect()
    }

    #[test]
    fn split_points_land_in_silence() {
        // 150 s sine with 200 ms of silence at t = 62 s: the first cut must
        // fall inside [45, 75] and specifically near the quiet patch.
        let audio = sine_with_silence(150.0, 62.0, 62.2);
        let points = find_split_points(&audio, 16000, 60);

        assert_eq!(points[0], 0);
        assert_eq!(*points.last().unwrap(), audio.len());
        assert!(points.windows(2).all(|w| w[0] < w[1]));

        let first_cut_secs = points[1] as f64 / 16000.0;
        assert!((45.0..=75.0).contains(&first_cut_secs), "{first_cut_secs}");
        assert!(
            (first_cut_secs - 62.05).abs() < 0.2,
            "cut at {first_cut_secs}, expected near 62.05"
        );
    }

    #[test]
    fn short_audio_stays_whole() {
        let audio = vec![0.1f32; 16000 * 5];
        let points = find_split_points(&audio, 16000, 60);
        assert_eq!(points, vec![0, audio.len()]);
    }

    #[test]
    fn short_input_is_single_chunk() {
        let driver = ChunkedAsrDriver::new(Arc::new(MockRecognizer));
        let samples = vec![0.1f32; 16000 * 5];
        let transcript = driver.transcribe_samples(&samples).unwrap();
        assert_eq!(transcript.text, "chunk");
        assert_eq!(transcript.tokens.len(), 1);
        assert_eq!(transcript.end_times.len(), 1);
    }

    #[test]
    fn chunked_end_times_are_offset_and_monotone() {
        let driver = ChunkedAsrDriver::new(Arc::new(MockRecognizer));
        let samples = sine_with_silence(150.0, 62.0, 62.2);
        let transcript = driver.transcribe_samples(&samples).unwrap();

        assert_eq!(transcript.tokens.len(), transcript.end_times.len());
        assert!(transcript.tokens.len() >= 2);
        assert!(
            transcript
                .end_times
                .windows(2)
                .all(|w| w[0] <= w[1]),
            "end times must be globally monotone: {:?}",
            transcript.end_times
        );
        // Chunk texts are joined with single spaces.
        assert_eq!(
            transcript.text.split(' ').count(),
            transcript.tokens.len()
        );
    }

    #[test]
    fn empty_audio_is_an_error() {
        let driver = ChunkedAsrDriver::new(Arc::new(MockRecognizer));
        assert!(matches!(
            driver.transcribe_samples(&[]),
            Err(AsrError::NoSamples)
        ));
    }

    #[test]
    fn recognizer_failure_fails_the_whole_run() {
        let driver = ChunkedAsrDriver::new(Arc::new(FailingRecognizer));
        let samples = vec![0.1f32; 16000 * 5];
        assert!(driver.transcribe_samples(&samples).is_err());

        let long = sine_with_silence(150.0, 62.0, 62.2);
        assert!(driver.transcribe_samples(&long).is_err());
    }
}
