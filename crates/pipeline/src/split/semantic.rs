use lauscher_config::LlmConfig;

use crate::llm::{self, ChatMessage, LlmError};

/// Asks the chat LLM to re-split a transcript at meaning boundaries.
///
/// The model may fix obvious ASR spelling mistakes but must not touch
/// grammar, so the pieces still concatenate to the input modulo whitespace
/// and spelling. Transport and parse failures bubble up; the caller falls
/// back to the rule-based passes.
pub async fn split_text_by_meaning(
    config: &LlmConfig,
    text: &str,
    max_length: usize,
) -> Result<Vec<String>, LlmError> {
    let prompt = format!(
        "Split the following text into smaller, meaningful segments for subtitle generation.\n\
         Each segment should be roughly under {max_length} characters if possible, but prioritize meaning.\n\
         You may fix obvious transcription spelling errors, but never correct grammar or reword.\n\
         Return the result as a JSON list of strings.\n\
         \n\
         Text: \"{text}\""
    );

    let messages = [
        ChatMessage::system("You are a helpful assistant that splits text into subtitles."),
        ChatMessage::user(prompt),
    ];

    let content = llm::chat_completion(config, &messages).await?;
    let parts = llm::parse_split_response(&content)?;

    if parts.is_empty() {
        return Err(LlmError::UnexpectedResponse(
            "model returned no segments".to_string(),
        ));
    }

    Ok(parts)
}
