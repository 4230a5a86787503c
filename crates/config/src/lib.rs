pub mod patch;
pub mod store;

pub use patch::ConfigPatch;
pub use store::ConfigStore;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Chat LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Text-to-speech service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    pub api_key: String,
    pub model: String,
    pub voice_map: TtsVoiceMap,
    pub defaults: TtsDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsVoiceMap {
    pub male: String,
    pub female: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsDefaults {
    pub speed: String,
    pub tone: String,
    pub language: String,
}

/// Offline recognizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrConfig {
    pub method: String,
    pub parakeet_model_dir: String,
    pub enable_demucs: bool,
    pub enable_vad: bool,
}

/// Segmentation and language settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub max_split_length: usize,
    pub use_llm: bool,
    pub source_language: String,
    pub target_language: String,
    pub nlp_model_map: HashMap<String, String>,
}

/// NLP annotator sidecar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    pub base_url: String,
}

/// Process-level settings not exposed through the config API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub asr: AsrConfig,
    pub app: AppSettings,
    pub nlp: NlpConfig,
    #[serde(skip)]
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "lauscher".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl AppConfig {
    /// Resolves the configuration from process environment variables.
    ///
    /// A `.env` file next to the working directory is honored first, matching
    /// how the service is deployed alongside its data directories.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolves the configuration from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let max_split_length = var("APP_MAX_SPLIT_LENGTH", "80");
        let max_split_length: usize =
            max_split_length
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "APP_MAX_SPLIT_LENGTH".to_string(),
                    message: format!("expected an integer, got '{max_split_length}'"),
                })?;

        let mut nlp_model_map = HashMap::new();
        nlp_model_map.insert(
            "de".to_string(),
            var("APP_NLP_MODEL_DE", "de_core_news_md"),
        );

        Ok(Self {
            llm: LlmConfig {
                api_key: var("LLM_API_KEY", ""),
                base_url: var("LLM_BASE_URL", "https://example-llm-provider.com/v1"),
                model: var("LLM_MODEL", "gemini-2.5-flash"),
            },
            tts: TtsConfig {
                api_key: var("TTS_API_KEY", ""),
                model: var("TTS_MODEL", "gemini-2.5-flash-preview-tts"),
                voice_map: TtsVoiceMap {
                    male: var("TTS_VOICE_MALE", "Orus"),
                    female: var("TTS_VOICE_FEMALE", "Kore"),
                },
                defaults: TtsDefaults {
                    speed: var("TTS_SPEED", "Native conversational pace"),
                    tone: var("TTS_TONE", "Clear, educational, engaging"),
                    language: var("TTS_LANGUAGE", "de-DE"),
                },
            },
            asr: AsrConfig {
                method: var("ASR_METHOD", "parakeet"),
                parakeet_model_dir: var(
                    "ASR_PARAKEET_MODEL_DIR",
                    "models/sherpa-onnx-nemo-parakeet-tdt-0.6b-v3-int8",
                ),
                enable_demucs: parse_bool(&var("ASR_ENABLE_DEMUCS", "false")),
                enable_vad: parse_bool(&var("ASR_ENABLE_VAD", "false")),
            },
            app: AppSettings {
                max_split_length,
                use_llm: parse_bool(&var("APP_USE_LLM", "true")),
                source_language: var("APP_SOURCE_LANGUAGE", "de"),
                target_language: var("APP_TARGET_LANGUAGE", "de"),
                nlp_model_map,
            },
            nlp: NlpConfig {
                base_url: var("NLP_BASE_URL", "http://127.0.0.1:8090"),
            },
            server: ServerConfig {
                bind_addr: var("BIND_ADDR", "0.0.0.0:8000"),
                mongodb_uri: var("MONGODB_URI", "mongodb://localhost:27017"),
                mongodb_db: var("MONGODB_DB", "lauscher"),
                output_dir: var("APP_OUTPUT_DIR", "output"),
            },
        })
    }

    /// Serializes the API-visible sections with API keys masked.
    pub fn masked_view(&self) -> serde_json::Value {
        let mut view = serde_json::to_value(self).unwrap_or_default();
        for path in ["llm", "tts"] {
            if let Some(section) = view.get_mut(path)
                && let Some(key) = section.get_mut("api_key")
                && key.as_str().is_some_and(|k| !k.is_empty())
            {
                *key = serde_json::Value::String("********".to_string());
            }
        }
        view
    }

    /// Joiner between tokens for the given language ("" for scripts without
    /// inter-word spacing, " " otherwise).
    pub fn joiner(language: &str) -> &'static str {
        if language == "zh" { "" } else { " " }
    }
}
