use std::path::Path;

/// Reads a WAV file into f32 mono samples plus its sample rate.
///
/// 16/24/32-bit integer and 32-bit float formats are supported. Multi-channel
/// audio is down-mixed by per-frame mean; non-finite samples are replaced
/// with 0.
pub fn read_wav_samples(path: impl AsRef<Path>) -> anyhow::Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to open WAV '{}': {}", path.as_ref().display(), e))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.unwrap_or(0) as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.unwrap_or(0.0))
            .collect(),
    };

    let mut mono: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    for sample in &mut mono {
        if !sample.is_finite() {
            *sample = 0.0;
        }
    }

    Ok((mono, spec.sample_rate))
}

/// Duration of a WAV file in seconds, from its header.
pub fn wav_duration_secs(path: impl AsRef<Path>) -> anyhow::Result<f64> {
    let reader = hound::WavReader::open(path.as_ref())
        .map_err(|e| anyhow::anyhow!("Failed to open WAV '{}': {}", path.as_ref().display(), e))?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Resamples mono audio to `target_rate` by linear interpolation.
///
/// The output length is `max(1, round(duration * target_rate))`. A
/// single-sample input yields a constant-valued array of the target length.
pub fn resample_linear(audio: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || audio.is_empty() {
        return audio.to_vec();
    }

    let duration = audio.len() as f64 / source_rate as f64;
    let target_len = ((duration * target_rate as f64).round() as usize).max(1);

    if audio.len() == 1 {
        return vec![audio[0]; target_len];
    }

    let last = (audio.len() - 1) as f64;
    let step = if target_len > 1 {
        last / (target_len - 1) as f64
    } else {
        0.0
    };

    (0..target_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(audio.len() - 1);
            let frac = (pos - lo as f64) as f32;
            audio[lo] * (1.0 - frac) + audio[hi] * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &std::path::Path, spec: hound::WavSpec, samples: &[f32]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        match spec.sample_format {
            hound::SampleFormat::Float => {
                for &s in samples {
                    writer.write_sample(s).unwrap();
                }
            }
            hound::SampleFormat::Int => {
                for &s in samples {
                    writer
                        .write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .unwrap();
                }
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let audio = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&audio, 16000, 16000), audio);
    }

    #[test]
    fn resample_single_sample_is_constant() {
        let out = resample_linear(&[0.5], 8000, 16000);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn resample_halves_length() {
        let audio: Vec<f32> = (0..32000).map(|i| (i as f32 / 32000.0).sin()).collect();
        let out = resample_linear(&audio, 32000, 16000);
        assert_eq!(out.len(), 16000);
        // Endpoints are preserved by linear interpolation.
        assert!((out[0] - audio[0]).abs() < 1e-6);
        assert!((out[out.len() - 1] - audio[audio.len() - 1]).abs() < 1e-3);
    }

    #[test]
    fn stereo_is_downmixed_by_mean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        // Interleaved L/R frames: (0.2, 0.4), (−0.2, 0.6)
        write_wav(&path, spec, &[0.2, 0.4, -0.2, 0.6]);

        let (samples, rate) = read_wav_samples(&path).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(samples.len(), 2);
        assert!((samples[0] - 0.3).abs() < 1e-6);
        assert!((samples[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn non_finite_samples_are_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nan.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        write_wav(&path, spec, &[0.1, f32::NAN, f32::INFINITY, -0.1]);

        let (samples, _) = read_wav_samples(&path).unwrap();
        assert_eq!(samples, vec![0.1, 0.0, 0.0, -0.1]);
    }

    #[test]
    fn duration_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dur.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &vec![0.0; 8000]);
        assert!((wav_duration_secs(&path).unwrap() - 0.5).abs() < 1e-9);
    }
}
