use std::collections::HashMap;

use serde::Deserialize;

use crate::AppConfig;

/// Partial configuration update accepted by the config API.
///
/// Only fields present in the request body are applied; everything else
/// keeps its current value.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigPatch {
    pub llm: Option<LlmPatch>,
    pub tts: Option<TtsPatch>,
    pub asr: Option<AsrPatch>,
    pub app: Option<AppPatch>,
    pub nlp: Option<NlpPatch>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmPatch {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TtsPatch {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub voice_male: Option<String>,
    pub voice_female: Option<String>,
    pub speed: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AsrPatch {
    pub method: Option<String>,
    pub parakeet_model_dir: Option<String>,
    pub enable_demucs: Option<bool>,
    pub enable_vad: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppPatch {
    pub max_split_length: Option<usize>,
    pub use_llm: Option<bool>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub nlp_model_map: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NlpPatch {
    pub base_url: Option<String>,
}

macro_rules! merge {
    ($target:expr, $patch:expr, $($field:ident),+ $(,)?) => {
        $(if let Some(value) = $patch.$field {
            $target.$field = value;
        })+
    };
}

impl ConfigPatch {
    pub fn apply_to(self, config: &mut AppConfig) {
        if let Some(llm) = self.llm {
            merge!(config.llm, llm, api_key, base_url, model);
        }
        if let Some(tts) = self.tts {
            merge!(config.tts, tts, api_key, model);
            if let Some(male) = tts.voice_male {
                config.tts.voice_map.male = male;
            }
            if let Some(female) = tts.voice_female {
                config.tts.voice_map.female = female;
            }
            merge!(config.tts.defaults, tts, speed, tone, language);
        }
        if let Some(asr) = self.asr {
            merge!(
                config.asr,
                asr,
                method,
                parakeet_model_dir,
                enable_demucs,
                enable_vad,
            );
        }
        if let Some(app) = self.app {
            merge!(
                config.app,
                app,
                max_split_length,
                use_llm,
                source_language,
                target_language,
                nlp_model_map,
            );
        }
        if let Some(nlp) = self.nlp {
            merge!(config.nlp, nlp, base_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_patch_leaves_other_fields() {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        let patch: ConfigPatch = serde_json::from_value(serde_json::json!({
            "llm": { "model": "gpt-4o" },
            "app": { "max_split_length": 60 },
        }))
        .unwrap();
        patch.apply_to(&mut config);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, "https://example-llm-provider.com/v1");
        assert_eq!(config.app.max_split_length, 60);
        assert_eq!(config.app.source_language, "de");
    }

    #[test]
    fn tts_voice_and_defaults_patch() {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        let patch: ConfigPatch = serde_json::from_value(serde_json::json!({
            "tts": { "voice_female": "Aoede", "language": "en-US" },
        }))
        .unwrap();
        patch.apply_to(&mut config);
        assert_eq!(config.tts.voice_map.female, "Aoede");
        assert_eq!(config.tts.voice_map.male, "Orus");
        assert_eq!(config.tts.defaults.language, "en-US");
    }
}
