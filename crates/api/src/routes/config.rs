use axum::Json;
use axum::extract::State;
use serde_json::json;

use lauscher_config::ConfigPatch;
use lauscher_pipeline::llm::{self, ChatMessage};
use lauscher_pipeline::tts::{self, Voice};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.config.get().masked_view())
}

/// Merges a partial update into the cached configuration and returns the
/// resulting view. The merge lives for the process lifetime.
pub async fn update_config(
    State(state): State<AppState>,
    Json(patch): Json<ConfigPatch>,
) -> Json<serde_json::Value> {
    let updated = state.config.apply(patch);
    Json(updated.masked_view())
}

/// Probes the chat LLM with the supplied partial configuration merged over
/// the current one. Full error text is surfaced to the caller.
pub async fn test_llm(
    State(state): State<AppState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut config = (*state.config.get()).clone();
    patch.apply_to(&mut config);

    let messages = [ChatMessage::user("Hello, are you working?")];
    let response = llm::chat_completion(&config.llm, &messages)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Connection successful",
        "response": response,
    })))
}

/// Probes the TTS service by synthesizing a short fixed sentence.
pub async fn test_tts(
    State(state): State<AppState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut config = (*state.config.get()).clone();
    patch.apply_to(&mut config);

    let wav = tts::synthesize(
        &config.tts,
        "Hallo! Dies ist ein Verbindungstest.",
        Voice::default(),
    )
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Connection successful",
        "audio_bytes": wav.len(),
    })))
}
