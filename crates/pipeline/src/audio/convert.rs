use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AudioConversionError {
    #[error(
        "ffmpeg executable not found. Please install ffmpeg and add it to your PATH \
         (or set FFMPEG_BINARY)."
    )]
    DecoderMissing,
    #[error("ffmpeg conversion failed: {0}")]
    DecoderFailed(String),
    #[error("failed to run decoder: {0}")]
    Io(#[from] std::io::Error),
}

/// Returns the preferred ffmpeg binary path if available.
///
/// `FFMPEG_BINARY` overrides the `PATH` lookup.
fn ffmpeg_binary() -> Option<PathBuf> {
    if let Ok(custom) = std::env::var("FFMPEG_BINARY") {
        let custom = PathBuf::from(custom);
        if custom.exists() {
            return Some(custom);
        }
    }
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join("ffmpeg");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// True when the file is already a mono 16 kHz PCM/float WAV the recognizer
/// can consume directly.
fn is_normalized_wav(path: &Path) -> bool {
    let Ok(reader) = hound::WavReader::open(path) else {
        return false;
    };
    let spec = reader.spec();
    spec.sample_rate == 16000
        && spec.channels == 1
        && match spec.sample_format {
            hound::SampleFormat::Int => spec.bits_per_sample == 16,
            hound::SampleFormat::Float => spec.bits_per_sample == 32,
        }
}

/// Converts an arbitrary audio file to a mono 16 kHz WAV.
///
/// Already-normalized WAVs are returned unchanged. The output lands next to
/// the input as `<stem>.wav`, or `<stem>_converted.wav` when that would
/// overwrite the input itself.
pub async fn convert_to_wav(input_path: &Path) -> Result<PathBuf, AudioConversionError> {
    if is_normalized_wav(input_path) {
        return Ok(input_path.to_path_buf());
    }

    let stem = input_path.with_extension("");
    let mut output_path = stem.with_extension("wav");
    if output_path == input_path {
        output_path = PathBuf::from(format!("{}_converted.wav", stem.display()));
    }

    let ffmpeg = ffmpeg_binary().ok_or(AudioConversionError::DecoderMissing)?;

    let output = Command::new(&ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input_path)
        .args(["-ar", "16000", "-ac", "1"])
        .arg(&output_path)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(AudioConversionError::DecoderFailed(stderr));
    }

    Ok(output_path)
}

/// Best-effort vocal separation before normalization.
///
/// When the separator binary is missing or exits non-zero the original input
/// is used unchanged; separation failures never fail the task.
pub async fn separate_vocals(input_path: &Path) -> PathBuf {
    let Some(demucs) = which_in_path("demucs") else {
        warn!("Source separation enabled but 'demucs' not found on PATH, skipping");
        return input_path.to_path_buf();
    };

    let out_dir = input_path
        .parent()
        .unwrap_or(Path::new("."))
        .join("separated");

    let result = Command::new(&demucs)
        .args(["--two-stems", "vocals", "-o"])
        .arg(&out_dir)
        .arg(input_path)
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            let stem = input_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let vocals = out_dir.join("htdemucs").join(&stem).join("vocals.wav");
            if vocals.exists() {
                info!(path = %vocals.display(), "Using separated vocal track");
                return vocals;
            }
            warn!("Separator produced no vocals track, using original input");
            input_path.to_path_buf()
        }
        Ok(output) => {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Source separation failed, using original input"
            );
            input_path.to_path_buf()
        }
        Err(e) => {
            warn!("Failed to run separator: {e}, using original input");
            input_path.to_path_buf()
        }
    }
}

fn which_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
