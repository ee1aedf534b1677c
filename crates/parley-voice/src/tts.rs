use crate::config::SynthesisConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use parley_types::{AudioFormat, ChannelLayout, SynthesisModel};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Converts text into encoded audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;

    /// Container of the bytes returned by [`synthesize`](Self::synthesize).
    fn output_format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamRequest<'a> {
    voice_id: &'a str,
    style: &'a str,
    text: &'a str,
    rate: i32,
    pitch: i32,
    sample_rate: u32,
    format: AudioFormat,
    channel_type: ChannelLayout,
    model_version: SynthesisModel,
}

/// Murf streaming text-to-speech.
#[derive(Debug, Clone)]
pub struct MurfSynthesizer {
    client: Client,
    config: SynthesisConfig,
}

impl MurfSynthesizer {
    pub fn new(config: SynthesisConfig) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VoiceError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1/speech/stream",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, text: &'a str) -> StreamRequest<'a> {
        StreamRequest {
            voice_id: &self.config.voice_id,
            style: &self.config.style,
            text,
            rate: self.config.rate,
            pitch: self.config.pitch,
            sample_rate: self.config.sample_rate,
            format: self.config.format,
            channel_type: self.config.channel_type,
            model_version: self.config.model_version,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for MurfSynthesizer {
    #[instrument(skip(self, text), fields(text_bytes = text.len(), voice = %self.config.voice_id))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let response = self
            .client
            .post(self.stream_url())
            .header(ACCEPT, "*/*")
            .header("api-key", &self.config.api_key)
            .json(&self.build_request(text))
            .send()
            .await
            .map_err(|e| VoiceError::Tts(format!("Request Exception: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "synthesis service returned an error");
            return Err(VoiceError::Tts(format!("Murf Error: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Tts(format!("Request Exception: {e}")))?;

        debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }

    fn output_format(&self) -> AudioFormat {
        self.config.format
    }
}
