use crate::config::TranscriptionConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// One recorded utterance as received from the caller.
///
/// The bytes are forwarded untouched; no transcoding happens on this side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub data: Vec<u8>,
    /// Container type reported by the caller, e.g. `audio/webm`.
    pub mime_type: Option<String>,
}

impl AudioUpload {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Converts recorded audio into plain text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Returns the best transcript of `audio`. An empty string means
    /// nothing intelligible was heard.
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String, VoiceError>;
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
}

impl ListenResponse {
    /// Best alternative of the first channel.
    fn into_transcript(self) -> Option<String> {
        self.results
            .channels
            .into_iter()
            .next()?
            .alternatives
            .into_iter()
            .next()
            .map(|alt| alt.transcript)
    }
}

/// Deepgram pre-recorded transcription over HTTP.
#[derive(Debug, Clone)]
pub struct DeepgramTranscriber {
    client: Client,
    config: TranscriptionConfig,
}

impl DeepgramTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VoiceError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn listen_url(&self) -> String {
        format!("{}/v1/listen", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    #[instrument(skip(self, audio), fields(audio_bytes = audio.len()))]
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String, VoiceError> {
        if audio.len() > self.config.max_audio_bytes {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                self.config.max_audio_bytes
            )));
        }

        let content_type = audio
            .mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_content_type.as_str());
        debug!(content_type, "sending audio for transcription");

        let smart_format = if self.config.smart_format {
            "true"
        } else {
            "false"
        };

        let response = self
            .client
            .post(self.listen_url())
            .query(&[
                ("model", self.config.model.as_str()),
                ("smart_format", smart_format),
                ("language", self.config.language.as_str()),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.api_key))
            .header(CONTENT_TYPE, content_type)
            .body(audio.data.clone())
            .send()
            .await
            .map_err(|e| VoiceError::Stt(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "transcription service returned an error");
            return Err(VoiceError::Stt(format!("Deepgram API Error {status}: {body}")));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Stt(format!("invalid transcription response: {e}")))?;

        parsed
            .into_transcript()
            .ok_or_else(|| VoiceError::Stt("response contained no transcript".to_string()))
    }
}
