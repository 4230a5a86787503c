pub mod driver;

#[cfg(feature = "local-parakeet")]
pub mod parakeet;

use std::path::{Path, PathBuf};

pub use driver::{ChunkedAsrDriver, find_split_points};

#[derive(Debug, thiserror::Error)]
pub enum AsrError {
    #[error("loaded audio contains no samples")]
    NoSamples,
    #[error("model artifact not found at {0}")]
    ModelArtifactMissing(PathBuf),
    #[error("no ASR backend compiled in; rebuild with the 'local-parakeet' feature")]
    BackendUnavailable,
    #[error("recognizer failed: {0}")]
    Recognizer(String),
    #[error(transparent)]
    Audio(#[from] anyhow::Error),
}

/// Output of one recognizer invocation over a single waveform.
#[derive(Debug, Clone, Default)]
pub struct RecognizerOutput {
    pub text: String,
    pub tokens: Vec<String>,
    /// End time of each token in seconds, relative to the waveform start.
    pub end_times: Vec<f64>,
}

/// Offline transducer recognizer seam.
///
/// Implementations are synchronous and CPU-bound; callers off-load them to a
/// blocking thread.
pub trait Recognizer: Send + Sync {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<RecognizerOutput, AsrError>;

    fn name(&self) -> &str;
}

/// Locates the transducer artifacts inside a model directory.
#[derive(Debug, Clone)]
pub struct ModelDir {
    pub encoder: PathBuf,
    pub decoder: PathBuf,
    pub joiner: PathBuf,
    pub tokens: PathBuf,
}

impl ModelDir {
    /// Resolves and validates the artifact layout under `root`.
    pub fn locate(root: impl AsRef<Path>) -> Result<Self, AsrError> {
        let root = root.as_ref();
        let dir = Self {
            encoder: root.join("encoder.int8.onnx"),
            decoder: root.join("decoder.int8.onnx"),
            joiner: root.join("joiner.int8.onnx"),
            tokens: root.join("tokens.txt"),
        };
        for artifact in [&dir.encoder, &dir.decoder, &dir.joiner, &dir.tokens] {
            if !artifact.exists() {
                return Err(AsrError::ModelArtifactMissing(artifact.clone()));
            }
        }
        Ok(dir)
    }
}

/// Placeholder registered when no recognizer backend is compiled in. The
/// server still starts; ASR tasks fail with an explanatory message.
pub struct UnavailableRecognizer;

impl Recognizer for UnavailableRecognizer {
    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<RecognizerOutput, AsrError> {
        Err(AsrError::BackendUnavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
