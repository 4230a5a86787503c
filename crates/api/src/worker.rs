use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::json;
use tracing::{error, info, warn};

use lauscher_pipeline::asr::ChunkedAsrDriver;
use lauscher_pipeline::audio::{convert_to_wav, separate_vocals, wav_duration_secs};
use lauscher_pipeline::clean::prepare_upload_text;
use lauscher_pipeline::nlp::annotator_for;
use lauscher_pipeline::split::{
    MergeThresholds, presplit_by_silence, refine_segments, validate_and_merge,
};
use lauscher_pipeline::subtitle::{generate_json, generate_srt};
use lauscher_pipeline::tts::{self, Voice};

use crate::state::AppState;

/// Progress checkpoints committed by the worker, in order: after claim,
/// after normalization, after ASR, after splitting, on completion.
const PROGRESS_STARTED: f64 = 0.1;
const PROGRESS_CONVERTED: f64 = 0.3;
const PROGRESS_TRANSCRIBED: f64 = 0.6;
const PROGRESS_SPLIT: f64 = 0.9;

/// Runs the full pipeline for a claimed task.
///
/// Every failure is caught at this boundary and turned into a terminal
/// `failed` state with the error text as the task message; the service
/// itself never crashes on a bad task.
pub async fn process_audio_task(state: AppState, task_id: String) {
    let started = Instant::now();
    match run_pipeline(&state, &task_id).await {
        Ok(()) => {
            info!(%task_id, elapsed_secs = started.elapsed().as_secs_f64(), "Task completed");
        }
        Err(e) => {
            error!(%task_id, "Task failed: {e:#}");
            if let Err(db_err) = state.tasks.fail(&task_id, &format!("{e:#}")).await {
                error!(%task_id, "Failed to record task failure: {db_err}");
            }
        }
    }
}

async fn run_pipeline(state: &AppState, task_id: &str) -> anyhow::Result<()> {
    let task = state.tasks.get(task_id).await?;
    state.tasks.set_progress(task_id, PROGRESS_STARTED).await?;

    let config = state.config.get();
    let input_path = PathBuf::from(&task.file_path);

    // 1. Normalize audio (optionally separating vocals first).
    let step = Instant::now();
    let source_path = if config.asr.enable_demucs {
        separate_vocals(&input_path).await
    } else {
        input_path.clone()
    };
    let wav_path = convert_to_wav(&source_path).await?;
    let convert_secs = step.elapsed().as_secs_f64();
    state.tasks.set_progress(task_id, PROGRESS_CONVERTED).await?;

    // 2. Chunked offline recognition (CPU-bound, off the async runtime).
    let step = Instant::now();
    let recognizer = state.recognizer.clone();
    let wav_for_asr = wav_path.clone();
    let transcript =
        tokio::task::spawn_blocking(move || {
            ChunkedAsrDriver::new(recognizer).transcribe_file(&wav_for_asr)
        })
        .await??;
    let asr_secs = step.elapsed().as_secs_f64();
    state.tasks.set_progress(task_id, PROGRESS_TRANSCRIBED).await?;

    // Duration from the token stream, falling back to the WAV header.
    let file_duration = match wav_duration_secs(&wav_path) {
        Ok(d) => d,
        Err(e) => {
            warn!(%task_id, "Could not read duration from audio file: {e}");
            0.0
        }
    };

    // The normalized WAV is an intermediate unless it IS the upload.
    if wav_path != Path::new(&task.file_path)
        && let Err(e) = tokio::fs::remove_file(&wav_path).await
    {
        warn!(%task_id, "Failed to remove temporary WAV {}: {e}", wav_path.display());
    }

    let last_timestamp = transcript.end_times.last().copied().unwrap_or(0.0);
    let duration = if last_timestamp > 0.0 {
        last_timestamp
    } else {
        file_duration
    };
    state.tasks.set_duration(task_id, duration).await?;

    // 3. Silence pre-split, then linguistic/semantic refinement.
    let step = Instant::now();
    let mut segments = presplit_by_silence(&transcript, duration);
    if let Some(last) = segments.last_mut() {
        last.end = last.end.max(duration);
    }

    let annotator = annotator_for(&config, &config.app.source_language);
    let refined = refine_segments(segments, &config, annotator.as_ref()).await?;
    let merged = validate_and_merge(
        refined,
        &MergeThresholds {
            max_length: config.app.max_split_length,
            ..MergeThresholds::default()
        },
    );
    let split_secs = step.elapsed().as_secs_f64();
    state.tasks.set_progress(task_id, PROGRESS_SPLIT).await?;

    // 4. Emit subtitles and persist the result blob.
    let srt = generate_srt(&merged);
    let target_language =
        (!config.app.target_language.is_empty()).then_some(config.app.target_language.as_str());
    let segments: serde_json::Value =
        serde_json::from_str(&generate_json(&merged, target_language))?;
    let result = json!({ "segments": segments, "srt": srt });
    state.tasks.complete(task_id, &result.to_string()).await?;

    info!(
        %task_id,
        convert_secs,
        asr_secs,
        split_secs,
        segments = merged.len(),
        "Pipeline timing breakdown"
    );

    Ok(())
}

/// Text→audio bridge: cleans the uploaded text, synthesizes speech, swaps
/// the stored file for the generated WAV and runs the regular pipeline.
pub async fn convert_text_and_process(
    state: AppState,
    task_id: String,
    text_path: PathBuf,
    original_filename: String,
) {
    if let Err(e) = state.tasks.set_message(&task_id, "Generating audio...").await {
        warn!(%task_id, "Failed to update task message: {e}");
    }

    let generated = synthesize_upload(&state, &text_path, &original_filename, &task_id).await;

    // The raw text upload is consumed either way.
    if let Err(e) = tokio::fs::remove_file(&text_path).await {
        warn!(%task_id, "Failed to remove temporary text file: {e}");
    }

    match generated {
        Ok(wav_path) => {
            if let Err(e) = state
                .tasks
                .set_file_path(&task_id, &wav_path.to_string_lossy())
                .await
            {
                error!(%task_id, "Failed to record generated audio path: {e}");
                return;
            }
            process_audio_task(state, task_id).await;
        }
        Err(e) => {
            error!(%task_id, "Text to audio failed: {e:#}");
            let message = format!("Text to audio failed: {e:#}");
            if let Err(db_err) = state.tasks.fail(&task_id, &message).await {
                error!(%task_id, "Failed to record task failure: {db_err}");
            }
        }
    }
}

async fn synthesize_upload(
    state: &AppState,
    text_path: &Path,
    original_filename: &str,
    task_id: &str,
) -> anyhow::Result<PathBuf> {
    let raw = tokio::fs::read_to_string(text_path).await?;
    let is_markdown = text_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
    let text = prepare_upload_text(&raw, is_markdown);
    if text.is_empty() {
        anyhow::bail!("uploaded file contains no readable text");
    }

    let config = state.config.get();
    let wav_bytes = tts::synthesize(&config.tts, &text, Voice::default()).await?;

    let stem = Path::new(original_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "generated".to_string());
    let wav_path = state.uploads_dir.join(format!("{task_id}_{stem}.wav"));
    tokio::fs::write(&wav_path, &wav_bytes).await?;

    info!(%task_id, path = %wav_path.display(), "Generated audio from text upload");
    Ok(wav_path)
}
