use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;
use tracing::info;

use lauscher_config::TtsConfig;

/// Sample rate of the PCM stream the TTS service returns.
const TTS_SAMPLE_RATE: u32 = 24000;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("TTS API key is not configured")]
    MissingApiKey,
    #[error("TTS request failed: {0}")]
    Request(String),
    #[error("TTS returned an unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("failed to build WAV container: {0}")]
    Wav(String),
}

/// Which configured voice to synthesize with.
#[derive(Debug, Clone, Copy, Default)]
pub enum Voice {
    Male,
    #[default]
    Female,
}

/// Builds the style-and-content prompt for the generative TTS model from
/// the configured delivery defaults.
fn build_prompt(config: &TtsConfig, text: &str) -> String {
    format!(
        "Read the following text aloud in {language}. Tone: {tone}. Pace: {speed}.\n\n{text}",
        language = config.defaults.language,
        tone = config.defaults.tone,
        speed = config.defaults.speed,
    )
}

/// Synthesizes speech for `text` and returns a complete WAV file.
///
/// The service responds with inline base64 PCM16 mono at 24 kHz; the samples
/// are wrapped into a RIFF/WAV container here so downstream audio handling
/// sees a regular file.
pub async fn synthesize(config: &TtsConfig, text: &str, voice: Voice) -> Result<Vec<u8>, TtsError> {
    if config.api_key.is_empty() {
        return Err(TtsError::MissingApiKey);
    }

    let voice_name = match voice {
        Voice::Male => &config.voice_map.male,
        Voice::Female => &config.voice_map.female,
    };

    let url = format!(
        "{DEFAULT_ENDPOINT}/models/{}:generateContent",
        config.model
    );

    let body = json!({
        "contents": [{
            "parts": [{ "text": build_prompt(config, text) }],
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice_name },
                },
            },
        },
    });

    let response = reqwest::Client::new()
        .post(&url)
        .header("x-goog-api-key", &config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| TtsError::Request(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(TtsError::Request(format!("{status}: {body}")));
    }

    let parsed: serde_json::Value = response
        .json()
        .await
        .map_err(|e| TtsError::UnexpectedResponse(e.to_string()))?;

    let data = parsed["candidates"][0]["content"]["parts"][0]["inlineData"]["data"]
        .as_str()
        .ok_or_else(|| {
            TtsError::UnexpectedResponse("no inline audio data in response".to_string())
        })?;

    let pcm = BASE64
        .decode(data)
        .map_err(|e| TtsError::UnexpectedResponse(format!("invalid base64 audio: {e}")))?;

    info!(bytes = pcm.len(), "TTS returned PCM audio");
    wrap_pcm16_wav(&pcm)
}

/// Wraps raw little-endian PCM16 mono 24 kHz samples into a WAV container.
pub fn wrap_pcm16_wav(pcm: &[u8]) -> Result<Vec<u8>, TtsError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TTS_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| TtsError::Wav(e.to_string()))?;
        for frame in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([frame[0], frame[1]]);
            writer
                .write_sample(sample)
                .map_err(|e| TtsError::Wav(e.to_string()))?;
        }
        writer.finalize().map_err(|e| TtsError::Wav(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_wav_has_expected_format() {
        // 100 ms of a simple ramp.
        let samples: Vec<i16> = (0..2400).map(|i| (i % 256) as i16 * 16).collect();
        let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();

        let wav = wrap_pcm16_wav(&pcm).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.duration(), 2400);

        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        let wav = wrap_pcm16_wav(&[0x00, 0x01, 0xFF]).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.duration(), 1);
    }

    #[test]
    fn prompt_carries_delivery_defaults() {
        let config = lauscher_config::AppConfig::from_lookup(|_| None).unwrap().tts;
        let prompt = build_prompt(&config, "Hallo.");
        assert!(prompt.contains("de-DE"));
        assert!(prompt.contains("Clear, educational, engaging"));
        assert!(prompt.ends_with("Hallo."));
    }
}
