//! In-process transducer recognizer over ONNX Runtime.
//!
//! Expects a NeMo-style transducer export in the model directory: an
//! encoder taking `audio_signal` (log-mel features `[1, 80, T]`) plus
//! `length`, a stateless two-token-context decoder taking `targets` plus
//! `target_length`, and a joiner combining one encoder frame with one
//! decoder output into vocabulary logits. Greedy decoding; token end times
//! derive from the encoder frame index (80 ms per frame).

use std::f32::consts::PI;
use std::path::Path;

use ndarray::{Array1, Array2, Array3};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use parking_lot::Mutex;
use rustfft::{FftPlanner, num_complex::Complex};
use tracing::info;

use super::{AsrError, ModelDir, Recognizer, RecognizerOutput};

const N_MELS: usize = 80;
const N_FFT: usize = 512;
const WIN_LENGTH: usize = 400; // 25 ms @ 16 kHz
const HOP_LENGTH: usize = 160; // 10 ms @ 16 kHz
/// Encoder subsampling: one output frame per 80 ms of audio.
const ENCODER_FRAME_SECS: f64 = 0.08;
/// Stateless decoder context width.
const CONTEXT_SIZE: usize = 2;
/// Cap on symbols emitted per encoder frame.
const MAX_SYMBOLS_PER_FRAME: usize = 3;

pub struct ParakeetRecognizer {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    joiner: Mutex<Session>,
    tokens: Vec<String>,
    blank_id: usize,
}

fn build_session(path: &Path) -> Result<Session, AsrError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(4))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| AsrError::Recognizer(format!("failed to load '{}': {e}", path.display())))
}

impl ParakeetRecognizer {
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self, AsrError> {
        let artifacts = ModelDir::locate(model_dir)?;

        let tokens = load_tokens(&artifacts.tokens)?;
        if tokens.is_empty() {
            return Err(AsrError::Recognizer("tokens.txt is empty".to_string()));
        }
        let blank_id = tokens.len() - 1;

        info!(
            vocab = tokens.len(),
            "Loading Parakeet transducer from '{}'",
            artifacts.encoder.parent().unwrap_or(Path::new(".")).display()
        );

        Ok(Self {
            encoder: Mutex::new(build_session(&artifacts.encoder)?),
            decoder: Mutex::new(build_session(&artifacts.decoder)?),
            joiner: Mutex::new(build_session(&artifacts.joiner)?),
            tokens,
            blank_id,
        })
    }

    fn run_encoder(&self, features: Array3<f32>) -> Result<(Vec<f32>, usize, usize), AsrError> {
        let n_frames = features.shape()[2];
        let length = Array1::from_vec(vec![n_frames as i64]);

        let mut encoder = self.encoder.lock();
        let feat_ref = TensorRef::from_array_view(features.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;
        let len_ref = TensorRef::from_array_view(length.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;

        let outputs = encoder
            .run(ort::inputs!["audio_signal" => feat_ref, "length" => len_ref])
            .map_err(|e| AsrError::Recognizer(format!("encoder failed: {e}")))?;

        let array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| AsrError::Recognizer(format!("encoder output: {e}")))?;
        let shape = array.shape().to_vec();
        if shape.len() != 3 {
            return Err(AsrError::Recognizer(format!(
                "unexpected encoder output shape {shape:?}"
            )));
        }
        // [1, D, T]
        Ok((array.iter().copied().collect(), shape[1], shape[2]))
    }

    fn run_decoder(&self, context: &[i64]) -> Result<Vec<f32>, AsrError> {
        let targets = Array2::from_shape_vec((1, context.len()), context.to_vec())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;
        let target_length = Array1::from_vec(vec![context.len() as i32]);

        let mut decoder = self.decoder.lock();
        let targets_ref = TensorRef::from_array_view(targets.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;
        let len_ref = TensorRef::from_array_view(target_length.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;

        let outputs = decoder
            .run(ort::inputs!["targets" => targets_ref, "target_length" => len_ref])
            .map_err(|e| AsrError::Recognizer(format!("decoder failed: {e}")))?;

        let array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| AsrError::Recognizer(format!("decoder output: {e}")))?;
        Ok(array.iter().copied().collect())
    }

    fn run_joiner(&self, enc_frame: &[f32], dec_out: &[f32]) -> Result<Vec<f32>, AsrError> {
        let enc = Array3::from_shape_vec((1, enc_frame.len(), 1), enc_frame.to_vec())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;
        let dec = Array3::from_shape_vec((1, dec_out.len(), 1), dec_out.to_vec())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;

        let mut joiner = self.joiner.lock();
        let enc_ref = TensorRef::from_array_view(enc.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;
        let dec_ref = TensorRef::from_array_view(dec.view())
            .map_err(|e| AsrError::Recognizer(e.to_string()))?;

        let outputs = joiner
            .run(ort::inputs!["encoder_outputs" => enc_ref, "decoder_outputs" => dec_ref])
            .map_err(|e| AsrError::Recognizer(format!("joiner failed: {e}")))?;

        let array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| AsrError::Recognizer(format!("joiner output: {e}")))?;
        Ok(array.iter().copied().collect())
    }
}

impl Recognizer for ParakeetRecognizer {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<RecognizerOutput, AsrError> {
        if samples.is_empty() {
            return Err(AsrError::NoSamples);
        }
        debug_assert_eq!(sample_rate, 16000);

        let features = log_mel_spectrogram(samples);
        let (enc_data, enc_dim, enc_frames) = self.run_encoder(features)?;

        let mut emitted: Vec<usize> = Vec::new();
        let mut end_times: Vec<f64> = Vec::new();
        let mut context = vec![self.blank_id as i64; CONTEXT_SIZE];
        let mut dec_out = self.run_decoder(&context)?;

        for t in 0..enc_frames {
            // Encoder layout is [1, D, T]: stride over the frame axis.
            let frame: Vec<f32> = (0..enc_dim).map(|d| enc_data[d * enc_frames + t]).collect();

            for _ in 0..MAX_SYMBOLS_PER_FRAME {
                let logits = self.run_joiner(&frame, &dec_out)?;
                let best = logits
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i)
                    .unwrap_or(self.blank_id);

                if best == self.blank_id || best >= self.tokens.len() {
                    break;
                }

                emitted.push(best);
                end_times.push((t + 1) as f64 * ENCODER_FRAME_SECS);
                context.remove(0);
                context.push(best as i64);
                dec_out = self.run_decoder(&context)?;
            }
        }

        let tokens: Vec<String> = emitted
            .iter()
            .map(|&id| self.tokens[id].replace('\u{2581}', " "))
            .collect();
        let text = tokens.concat().trim().to_string();

        Ok(RecognizerOutput {
            text,
            tokens,
            end_times,
        })
    }

    fn name(&self) -> &str {
        "parakeet"
    }
}

/// Parses a `tokens.txt` vocabulary ("<token> <id>" per line).
fn load_tokens(path: &Path) -> Result<Vec<String>, AsrError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AsrError::Recognizer(format!("failed to read tokens: {e}")))?;

    let mut pairs: Vec<(usize, String)> = Vec::new();
    for line in content.lines() {
        let Some((token, id)) = line.rsplit_once(' ') else {
            continue;
        };
        let Ok(id) = id.trim().parse::<usize>() else {
            continue;
        };
        pairs.push((id, token.to_string()));
    }
    pairs.sort_by_key(|(id, _)| *id);
    Ok(pairs.into_iter().map(|(_, token)| token).collect())
}

/// Computes a log-mel spectrogram `[1, 80, T]` from 16 kHz mono samples.
fn log_mel_spectrogram(samples: &[f32]) -> Array3<f32> {
    let n_frames = if samples.len() >= WIN_LENGTH {
        1 + (samples.len() - WIN_LENGTH) / HOP_LENGTH
    } else {
        1
    };

    let hann: Vec<f32> = (0..WIN_LENGTH)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / WIN_LENGTH as f32).cos())
        .collect();
    let filterbank = mel_filterbank(16000.0, N_FFT, N_MELS);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let mut mel = Array3::<f32>::zeros((1, N_MELS, n_frames));
    let mut buffer = vec![Complex::new(0.0f32, 0.0f32); N_FFT];

    for frame in 0..n_frames {
        let offset = frame * HOP_LENGTH;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = if i < WIN_LENGTH {
                samples.get(offset + i).copied().unwrap_or(0.0) * hann[i]
            } else {
                0.0
            };
            *slot = Complex::new(sample, 0.0);
        }
        fft.process(&mut buffer);

        let power: Vec<f32> = buffer[..N_FFT / 2 + 1]
            .iter()
            .map(|c| c.norm_sqr())
            .collect();

        for (m, filter) in filterbank.iter().enumerate() {
            let energy: f32 = filter
                .iter()
                .zip(power.iter())
                .map(|(w, p)| w * p)
                .sum();
            mel[[0, m, frame]] = (energy + 1e-10).ln();
        }
    }

    mel
}

/// Triangular mel filterbank over the power spectrum bins.
fn mel_filterbank(sample_rate: f32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let mel = |hz: f32| 2595.0 * (1.0 + hz / 700.0).log10();
    let hz = |mel: f32| 700.0 * (10f32.powf(mel / 2595.0) - 1.0);

    let mel_lo = mel(0.0);
    let mel_hi = mel(sample_rate / 2.0);
    let centers: Vec<f32> = (0..n_mels + 2)
        .map(|i| hz(mel_lo + (mel_hi - mel_lo) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let bin_hz = sample_rate / n_fft as f32;
    (0..n_mels)
        .map(|m| {
            let (lo, center, hi) = (centers[m], centers[m + 1], centers[m + 2]);
            (0..n_bins)
                .map(|bin| {
                    let freq = bin as f32 * bin_hz;
                    if freq <= lo || freq >= hi {
                        0.0
                    } else if freq <= center {
                        (freq - lo) / (center - lo)
                    } else {
                        (hi - freq) / (hi - center)
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_parse_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.txt");
        std::fs::write(&path, "\u{2581}Welt 1\nHallo 0\n. 2\n<blk> 3\n").unwrap();
        let tokens = load_tokens(&path).unwrap();
        assert_eq!(tokens, vec!["Hallo", "\u{2581}Welt", ".", "<blk>"]);
    }

    #[test]
    fn mel_spectrogram_shape_tracks_input_length() {
        let samples = vec![0.1f32; 16000]; // 1 s
        let mel = log_mel_spectrogram(&samples);
        let expected_frames = 1 + (16000 - WIN_LENGTH) / HOP_LENGTH;
        assert_eq!(mel.shape(), &[1, N_MELS, expected_frames]);
    }

    #[test]
    fn filterbank_rows_cover_the_spectrum() {
        let fb = mel_filterbank(16000.0, N_FFT, N_MELS);
        assert_eq!(fb.len(), N_MELS);
        assert!(fb.iter().all(|row| row.len() == N_FFT / 2 + 1));
        // Every filter has some mass.
        assert!(fb.iter().all(|row| row.iter().any(|&w| w > 0.0)));
    }
}
