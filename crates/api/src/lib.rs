pub mod error;
pub mod routes;
pub mod state;
pub mod worker;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Audio task routes (100 MB body limit for uploads)
    let audio_routes = Router::new()
        .route("/upload", post(routes::audio::upload))
        .route("/process/{task_id}", post(routes::audio::process))
        .route("/status/{task_id}", get(routes::audio::status))
        .route("/result/{task_id}", get(routes::audio::result))
        .route("/download/{task_id}/srt", get(routes::audio::download_srt))
        .route(
            "/practice/{task_id}/{segment_index}",
            post(routes::audio::upload_practice),
        )
        .route("/practice/{task_id}", get(routes::audio::list_practice))
        .route("/tasks", get(routes::audio::list_tasks))
        .route(
            "/tasks/{task_id}/progress",
            post(routes::audio::update_progress),
        )
        .route("/task/{task_id}", delete(routes::audio::delete_task))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024));

    // Config routes
    let config_routes = Router::new()
        .route(
            "/",
            get(routes::config::get_config).patch(routes::config::update_config),
        )
        .route("/test-llm", post(routes::config::test_llm))
        .route("/test-tts", post(routes::config::test_tts));

    let api = Router::new()
        .nest("/audio", audio_routes)
        .nest("/config", config_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        // Static mounts for playback of uploads and practice clips.
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .nest_service("/user_recordings", ServeDir::new(&state.recordings_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
