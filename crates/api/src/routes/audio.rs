use std::path::{Path as FsPath, PathBuf};

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use lauscher_db::models::{PracticeRecording, Task, TaskStatus};

use crate::error::ApiError;
use crate::state::AppState;
use crate::worker;

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub progress: f64,
    pub last_played_chunk_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub created_at: String,
}

impl TaskResponse {
    fn from_task(task: Task) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            message: task.message,
            progress: task.progress,
            last_played_chunk_index: task.last_played_chunk_index,
            file_path: Some(task.file_path),
            filename: Some(task.filename),
            duration: task.duration,
            created_at: task.created_at.to_chrono().to_rfc3339(),
        }
    }

    fn with_message(task: Task, message: &str) -> Self {
        let mut response = Self::from_task(task);
        response.message = Some(message.to_string());
        response
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub last_played_chunk_index: i64,
}

async fn read_upload_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("unknown").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;
            return Ok((filename, data.to_vec()));
        }
    }
    Err(ApiError::BadRequest("Missing 'file' field".to_string()))
}

fn extension_of(filename: &str) -> String {
    FsPath::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Accepts an audio (or text) upload and creates the task record.
///
/// Text uploads (`.txt`/`.md`) start in `processing` and immediately enter
/// the text→audio bridge; audio uploads wait in `pending` for an explicit
/// process request.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TaskResponse>, ApiError> {
    let (filename, data) = read_upload_field(&mut multipart).await?;
    let task_id = Uuid::new_v4().to_string();
    let ext = extension_of(&filename);

    let file_path = state.uploads_dir.join(format!("{task_id}_{filename}"));
    tokio::fs::write(&file_path, &data)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store upload: {e}")))?;

    if ext == "txt" || ext == "md" {
        let mut task = Task::new(
            task_id.clone(),
            TaskStatus::Processing,
            filename.clone(),
            file_path.to_string_lossy().to_string(),
        );
        task.message = Some("Queued for audio generation...".to_string());
        state.tasks.create(&task).await?;

        info!(%task_id, %filename, "Text upload accepted, scheduling synthesis");
        tokio::spawn(worker::convert_text_and_process(
            state.clone(),
            task_id,
            file_path,
            filename,
        ));

        return Ok(Json(TaskResponse::from_task(task)));
    }

    let task = Task::new(
        task_id,
        TaskStatus::Pending,
        filename,
        file_path.to_string_lossy().to_string(),
    );
    state.tasks.create(&task).await?;

    Ok(Json(TaskResponse::with_message(
        task,
        "File uploaded successfully",
    )))
}

/// Claims a pending task and starts the pipeline worker.
///
/// A second process request on a non-pending task is a no-op returning the
/// current state; the CAS claim guarantees at most one worker per task.
pub async fn process(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    match state.tasks.claim_pending(&task_id).await? {
        Some(task) => {
            tokio::spawn(worker::process_audio_task(state.clone(), task_id));
            Ok(Json(TaskResponse::with_message(task, "Processing started")))
        }
        None => {
            let task = state.tasks.get(&task_id).await?;
            Ok(Json(TaskResponse::from_task(task)))
        }
    }
}

pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.tasks.get(&task_id).await?;
    Ok(Json(TaskResponse::from_task(task)))
}

#[derive(Debug, Serialize)]
pub struct SubtitleResponse {
    pub task_id: String,
    pub segments: serde_json::Value,
}

fn completed_result(task: &Task) -> Result<serde_json::Value, ApiError> {
    if task.status != TaskStatus::Completed {
        return Err(ApiError::BadRequest("Task not completed".to_string()));
    }
    let raw = task
        .result
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Result is missing".to_string()))?;
    serde_json::from_str(raw)
        .map_err(|e| ApiError::Internal(format!("Stored result is corrupt: {e}")))
}

pub async fn result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<SubtitleResponse>, ApiError> {
    let task = state.tasks.get(&task_id).await?;
    let mut result = completed_result(&task)?;
    let segments = result
        .get_mut("segments")
        .map(serde_json::Value::take)
        .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));

    Ok(Json(SubtitleResponse {
        task_id: task.id,
        segments,
    }))
}

pub async fn download_srt(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks.get(&task_id).await?;
    let result = completed_result(&task)?;
    let srt = result
        .get("srt")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    // Keep a copy next to the upload so the static mount can serve it too.
    let srt_path = state.uploads_dir.join(format!("{task_id}.srt"));
    if let Err(e) = tokio::fs::write(&srt_path, &srt).await {
        warn!("Failed to persist subtitle file {}: {e}", srt_path.display());
    }

    let headers = [
        (header::CONTENT_TYPE, "application/x-subrip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"subtitle_{task_id}.srt\""),
        ),
    ];
    Ok((headers, srt))
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub id: String,
    #[serde(rename = "segmentIndex")]
    pub segment_index: i64,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

pub async fn upload_practice(
    State(state): State<AppState>,
    Path((task_id, segment_index)): Path<(String, i64)>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Reject recordings for unknown tasks up front.
    state.tasks.get(&task_id).await?;

    let (original_name, data) = read_upload_field(&mut multipart).await?;
    let ext = {
        let ext = extension_of(&original_name);
        if ext.is_empty() { "webm".to_string() } else { ext }
    };

    let filename = format!("{task_id}_{segment_index}_{}.{ext}", Uuid::new_v4());
    let path = state.recordings_dir.join(&filename);
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store recording: {e}")))?;

    let recording = PracticeRecording::new(
        Uuid::new_v4().to_string(),
        task_id,
        segment_index,
        filename.clone(),
    );
    state.recordings.create(&recording).await?;

    Ok(Json(serde_json::json!({
        "message": "Recording saved",
        "filePath": filename,
    })))
}

pub async fn list_practice(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<RecordingResponse>>, ApiError> {
    let recordings = state.recordings.list_for_task(&task_id).await?;
    let items = recordings
        .into_iter()
        .map(|r| RecordingResponse {
            id: r.id,
            segment_index: r.segment_index,
            file_path: r.file_path,
            created_at: r.created_at.to_chrono().to_rfc3339(),
        })
        .collect();
    Ok(Json(items))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state.tasks.list(params.skip, params.limit).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from_task).collect()))
}

pub async fn update_progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(body): Json<ProgressUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let found = state
        .tasks
        .set_last_played(&task_id, body.last_played_chunk_index)
        .await?;
    if !found {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Progress updated" })))
}

/// Removes a task, its stored upload, and all practice recordings.
/// File removals are best-effort; missing files only warn.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task = state.tasks.get(&task_id).await?;

    let recordings = state.recordings.list_for_task(&task_id).await?;
    for recording in &recordings {
        let path = state.recordings_dir.join(&recording.file_path);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to delete recording file {}: {e}", path.display());
        }
    }

    let upload_path = PathBuf::from(&task.file_path);
    if let Err(e) = tokio::fs::remove_file(&upload_path).await {
        warn!("Failed to delete task file {}: {e}", upload_path.display());
    }

    state.tasks.delete(&task_id).await?;
    info!(%task_id, "Task deleted");

    Ok(Json(serde_json::json!({ "message": "Task deleted successfully" })))
}
