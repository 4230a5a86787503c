use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use lauscher_config::AppConfig;

use super::{AnnotatedDoc, Annotator, NlpError};

/// Default annotator model when a language has no mapping.
const FALLBACK_MODEL: &str = "de_core_news_md";

/// Process-wide annotator cache, one handle per language.
///
/// Handles are cheap (an HTTP client plus the model name) but creating one
/// logs and pins the model choice, so they are created once and shared.
static ANNOTATORS: OnceLock<Mutex<HashMap<String, Arc<RemoteAnnotator>>>> = OnceLock::new();

/// Returns the shared annotator handle for a language, creating it on first
/// use.
pub fn annotator_for(config: &AppConfig, language: &str) -> Arc<RemoteAnnotator> {
    let cache = ANNOTATORS.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(existing) = cache.lock().get(language) {
        return existing.clone();
    }

    let model = match config.app.nlp_model_map.get(language) {
        Some(model) => model.clone(),
        None => {
            warn!(
                "No annotator model configured for '{language}', \
                 using {FALLBACK_MODEL} as fallback"
            );
            FALLBACK_MODEL.to_string()
        }
    };

    let mut guard = cache.lock();
    // Re-check under the lock; another task may have won the race.
    if let Some(existing) = guard.get(language) {
        return existing.clone();
    }

    info!("Loading NLP annotator for language '{language}': <{model}>");
    let annotator = Arc::new(RemoteAnnotator::new(
        config.nlp.base_url.clone(),
        language.to_string(),
        model,
    ));
    guard.insert(language.to_string(), annotator.clone());
    annotator
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    text: &'a str,
    model: &'a str,
}

/// HTTP client for the annotator sidecar.
///
/// The sidecar wraps the actual linguistic analyzer and returns tokens with
/// POS tags, dependency labels and sentence boundaries.
pub struct RemoteAnnotator {
    client: reqwest::Client,
    base_url: String,
    language: String,
    model: String,
}

impl RemoteAnnotator {
    pub fn new(base_url: String, language: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            language,
            model,
        }
    }
}

#[async_trait::async_trait]
impl Annotator for RemoteAnnotator {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDoc, NlpError> {
        let url = format!("{}/annotate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&AnnotateRequest {
                text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| NlpError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NlpError::Request(format!("{status}: {body}")));
        }

        let mut doc: AnnotatedDoc = response
            .json()
            .await
            .map_err(|e| NlpError::InvalidDocument(e.to_string()))?;
        doc.language = self.language.clone();

        for (start, end) in &doc.sents {
            if start >= end || *end > doc.tokens.len() {
                return Err(NlpError::InvalidDocument(format!(
                    "sentence range {start}..{end} out of bounds for {} tokens",
                    doc.tokens.len()
                )));
            }
        }

        Ok(doc)
    }

    fn language(&self) -> &str {
        &self.language
    }
}
