use std::path::PathBuf;
use std::sync::Arc;

use mongodb::Database;

use lauscher_config::ConfigStore;
use lauscher_pipeline::asr::Recognizer;
use lauscher_services::dao::{RecordingDao, TaskDao};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tasks: Arc<TaskDao>,
    pub recordings: Arc<RecordingDao>,
    pub recognizer: Arc<dyn Recognizer>,
    pub config: Arc<ConfigStore>,
    pub uploads_dir: PathBuf,
    pub recordings_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: Database,
        recognizer: Arc<dyn Recognizer>,
        config: Arc<ConfigStore>,
        uploads_dir: PathBuf,
        recordings_dir: PathBuf,
    ) -> Self {
        let tasks = Arc::new(TaskDao::new(&db));
        let recordings = Arc::new(RecordingDao::new(&db));
        Self {
            db,
            tasks,
            recordings,
            recognizer,
            config,
            uploads_dir,
            recordings_dir,
        }
    }
}
