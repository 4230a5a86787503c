use serde::{Deserialize, Serialize};

use lauscher_config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM API key is not configured")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned an unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Sends a chat completion request and returns the assistant message text.
pub async fn chat_completion(
    config: &LlmConfig,
    messages: &[ChatMessage],
) -> Result<String, LlmError> {
    if config.api_key.is_empty() {
        return Err(LlmError::MissingApiKey);
    }

    let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&ChatRequest {
            model: &config.model,
            messages,
        })
        .send()
        .await
        .map_err(|e| LlmError::Request(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Request(format!("{status}: {body}")));
    }

    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| LlmError::UnexpectedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| LlmError::UnexpectedResponse("empty choices array".to_string()))
}

/// Strips a surrounding Markdown code fence (```json ... ``` or ``` ... ```)
/// from a model response, if present.
pub fn strip_code_fences(content: &str) -> &str {
    let content = content.trim();
    if let Some(inner) = content.strip_prefix("```") {
        // Drop an optional language tag on the opening fence line.
        let inner = match inner.split_once('\n') {
            Some((first_line, rest)) if !first_line.contains("```") => rest,
            _ => inner.trim_start_matches("json"),
        };
        if let Some(inner) = inner.trim_end().strip_suffix("```") {
            return inner.trim();
        }
    }
    content
}

/// Parses the meaning-split response into its pieces.
pub fn parse_split_response(content: &str) -> Result<Vec<String>, LlmError> {
    let cleaned = strip_code_fences(content);
    let parts: Vec<String> = serde_json::from_str(cleaned)
        .map_err(|e| LlmError::UnexpectedResponse(format!("not a JSON string array: {e}")))?;
    Ok(parts.into_iter().filter(|p| !p.trim().is_empty()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let content = "```json\n[\"a\", \"b\"]\n```";
        assert_eq!(strip_code_fences(content), "[\"a\", \"b\"]");
    }

    #[test]
    fn strips_plain_fence() {
        let content = "```\n[\"a\"]\n```";
        assert_eq!(strip_code_fences(content), "[\"a\"]");
    }

    #[test]
    fn unfenced_content_is_untouched() {
        assert_eq!(strip_code_fences("[\"a\"]"), "[\"a\"]");
    }

    #[test]
    fn parses_fenced_array() {
        let parts = parse_split_response("```json\n[\"Erstens.\", \"Zweitens.\"]\n```").unwrap();
        assert_eq!(parts, vec!["Erstens.".to_string(), "Zweitens.".to_string()]);
    }

    #[test]
    fn rejects_non_array_responses() {
        assert!(parse_split_response("Here you go: first, second").is_err());
        assert!(parse_split_response("{\"pieces\": []}").is_err());
    }

    #[test]
    fn drops_blank_pieces() {
        let parts = parse_split_response("[\"eins\", \"  \", \"zwei\"]").unwrap();
        assert_eq!(parts.len(), 2);
    }
}
