use crate::config::DialogueConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use parley_types::{Role, Turn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Produces the next assistant utterance for a transcript.
#[async_trait]
pub trait DialogueModel: Send + Sync {
    /// `transcript` is the full conversation, system turn first.
    async fn complete(&self, transcript: &[Turn]) -> Result<String, VoiceError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Groq hosted chat completions (OpenAI-compatible wire format).
#[derive(Debug, Clone)]
pub struct GroqDialogue {
    client: Client,
    config: DialogueConfig,
}

impl GroqDialogue {
    pub fn new(config: DialogueConfig) -> Result<Self, VoiceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VoiceError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, transcript: &'a [Turn]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: transcript
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role(),
                    content: turn.content(),
                })
                .collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl DialogueModel for GroqDialogue {
    #[instrument(skip(self, transcript), fields(turns = transcript.len(), model = %self.config.model))]
    async fn complete(&self, transcript: &[Turn]) -> Result<String, VoiceError> {
        let request = self.build_request(transcript);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "completion service returned an error");
            return Err(VoiceError::Dialogue(format!("Error code: {} - {body}", status.as_u16())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Dialogue(format!("invalid completion response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VoiceError::Dialogue("response contained no choices".to_string()))?
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| VoiceError::Dialogue("response contained no content".to_string()))?;

        debug!(reply_chars = content.len(), "completion received");
        Ok(content)
    }
}
