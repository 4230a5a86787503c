use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lauscher_api::{build_router, state::AppState};
use lauscher_config::{AppConfig, ConfigStore};
use lauscher_pipeline::asr::{Recognizer, UnavailableRecognizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(ConfigStore::from_env()?);
    let cfg = config.get();

    let db = lauscher_db::connect(&cfg.server.mongodb_uri, &cfg.server.mongodb_db).await?;
    lauscher_db::indexes::ensure_indexes(&db).await?;

    let output_dir = Path::new(&cfg.server.output_dir);
    let uploads_dir = output_dir.join("uploads");
    let recordings_dir = output_dir.join("user_recordings");
    tokio::fs::create_dir_all(&uploads_dir).await?;
    tokio::fs::create_dir_all(&recordings_dir).await?;

    // Preload the recognizer so the first task does not pay model startup.
    let recognizer = build_recognizer(&cfg);
    info!(backend = recognizer.name(), "ASR backend ready");

    let state = AppState::new(db, recognizer, config, uploads_dir, recordings_dir);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr).await?;
    info!("Listening on {}", cfg.server.bind_addr);
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(feature = "local-parakeet")]
fn build_recognizer(cfg: &AppConfig) -> Arc<dyn Recognizer> {
    use lauscher_pipeline::asr::parakeet::ParakeetRecognizer;

    if cfg.asr.method == "parakeet" {
        match ParakeetRecognizer::load(&cfg.asr.parakeet_model_dir) {
            Ok(recognizer) => return Arc::new(recognizer),
            Err(e) => {
                warn!(
                    "Failed to load Parakeet model from '{}': {e}",
                    cfg.asr.parakeet_model_dir
                );
            }
        }
    } else {
        warn!("Unknown ASR method '{}'", cfg.asr.method);
    }
    Arc::new(UnavailableRecognizer)
}

#[cfg(not(feature = "local-parakeet"))]
fn build_recognizer(cfg: &AppConfig) -> Arc<dyn Recognizer> {
    warn!(
        "Built without a local ASR backend; method '{}' is unavailable and \
         audio tasks will fail until one is compiled in",
        cfg.asr.method
    );
    Arc::new(UnavailableRecognizer)
}
