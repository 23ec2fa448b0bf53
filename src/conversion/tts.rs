use bytes::Bytes;
use serde::Serialize;

use super::ConversionError;
use crate::config::TtsConfig;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// Client for the TTS vendor's speech endpoint.
#[derive(Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    cfg: TtsConfig,
}

impl TtsClient {
    pub fn new(http: reqwest::Client, cfg: TtsConfig) -> Self {
        Self { http, cfg }
    }

    pub fn response_format(&self) -> &str {
        &self.cfg.response_format
    }

    /// One attempt, no retry. Any failure aborts the conversion.
    pub async fn synthesize(&self, text: &str) -> Result<Bytes, ConversionError> {
        let url = format!("{}/api/v1/audio/speech", self.cfg.base_url);
        let body = SpeechRequest {
            model: &self.cfg.model,
            voice: &self.cfg.voice,
            input: text,
            response_format: &self.cfg.response_format,
        };

        tracing::debug!(model = %self.cfg.model, voice = %self.cfg.voice, input_len = text.len(), "tts request");

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "tts request failed");
                ConversionError::Synthesis(format!("request to tts vendor failed: {e}"))
            })?;

        let status = res.status();
        if !status.is_success() {
            let detail = res
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::error!(%status, body = %detail, "tts vendor rejected request");
            return Err(ConversionError::Synthesis(format!(
                "tts vendor returned {status}: {detail}"
            )));
        }

        let audio = res.bytes().await.map_err(|e| {
            tracing::error!(error = %e, "read tts response body");
            ConversionError::Synthesis(format!("read tts response: {e}"))
        })?;
        if audio.is_empty() {
            return Err(ConversionError::Synthesis("tts vendor returned no audio".into()));
        }

        tracing::debug!(bytes = audio.len(), "tts synthesis complete");
        Ok(audio)
    }
}

/// Content type for the audio format the vendor was asked for.
pub fn audio_content_type(format: &str) -> &'static str {
    match format {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "opus" => "audio/opus",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}
