//! Fixed settings for the three remote services and the conversation.
//!
//! Every constant the outbound calls need (model names, voice identity,
//! sampling parameters, endpoints, credentials) lives here rather than at
//! the call sites, so tests can point the clients at mock servers.

use crate::error::VoiceError;
use parley_types::{AudioFormat, ChannelLayout, SynthesisModel, RECOGNIZED_SAMPLE_RATES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Persona prompt that opens every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are 'CareerGenius', an expert Life and Career \
Strategist. Your goal is to build a personalized roadmap for the user's dream career. Follow \
this conversation flow STRICTLY:\n\
1. **Introduction:** Warmly welcome them and ask for their **Name and Age**.\n\
2. **Context:** Ask for their **Current Grade/Education Level** (e.g., 10th grade, 2nd year \
Engineering) and their **Dream Career** (e.g., Astronaut, Founder, AI Engineer).\n\
3. **Consultation:** Based on their age and grade, provide a specific, strategic path. Mention:\n\
   - Key subjects to master immediately.\n\
   - Essential exams (JEE, SAT, GATE, GRE).\n\
   - Critical soft skills or projects (e.g., 'Build a dashcam prototype' if they like hardware).\n\
4. **Closing:** Ask if they want a detailed timeline for the next 6 months.\n\n\
**Constraints:** Keep responses CONCISE (max 2 short sentences). Be encouraging but realistic.";

fn default_timeout_ms() -> u64 {
    30_000
}

/// Settings for all remote services plus the conversation itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl VoiceConfig {
    /// Checks every range-restricted setting.
    ///
    /// Missing credentials are not an error here: the remote service
    /// rejects the call and the failure surfaces per run.
    pub fn validate(&self) -> Result<(), VoiceError> {
        self.transcription.validate()?;
        self.dialogue.validate()?;
        self.synthesis.validate()?;
        if self.conversation.system_prompt.trim().is_empty() {
            return Err(VoiceError::Config(
                "conversation.system_prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Transcription ──

fn default_stt_base_url() -> String {
    "https://api.deepgram.com".to_string()
}

fn default_stt_model() -> String {
    "nova-2".to_string()
}

fn default_smart_format() -> bool {
    true
}

fn default_language() -> String {
    "en-IN".to_string()
}

fn default_content_type() -> String {
    "audio/webm".to_string()
}

fn default_max_audio_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Speech-recognition model name.
    #[serde(default = "default_stt_model")]
    pub model: String,
    /// Ask the service for punctuation and numeral formatting.
    #[serde(default = "default_smart_format")]
    pub smart_format: bool,
    /// Spoken language / locale variant, e.g. `en-IN`.
    #[serde(default = "default_language")]
    pub language: String,
    /// Container type announced when the upload does not carry one.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
    /// Uploads larger than this are rejected before any network call.
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_stt_base_url(),
            api_key: String::new(),
            model: default_stt_model(),
            smart_format: default_smart_format(),
            language: default_language(),
            default_content_type: default_content_type(),
            max_audio_bytes: default_max_audio_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("smart_format", &self.smart_format)
            .field("language", &self.language)
            .field("default_content_type", &self.default_content_type)
            .field("max_audio_bytes", &self.max_audio_bytes)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), VoiceError> {
        require_non_empty("transcription.base_url", &self.base_url)?;
        require_non_empty("transcription.model", &self.model)?;
        require_non_empty("transcription.language", &self.language)?;
        require_non_empty(
            "transcription.default_content_type",
            &self.default_content_type,
        )?;
        if self.max_audio_bytes == 0 {
            return Err(VoiceError::Config(
                "transcription.max_audio_bytes must be greater than 0".to_string(),
            ));
        }
        require_timeout("transcription.timeout_ms", self.timeout_ms)
    }
}

// ── Dialogue ──

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    80
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Sampling temperature, `0.0..=2.0`.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on reply length in tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for DialogueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogueConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl DialogueConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), VoiceError> {
        require_non_empty("dialogue.base_url", &self.base_url)?;
        require_non_empty("dialogue.model", &self.model)?;
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(VoiceError::Config(format!(
                "dialogue.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(VoiceError::Config(
                "dialogue.max_tokens must be greater than 0".to_string(),
            ));
        }
        require_timeout("dialogue.timeout_ms", self.timeout_ms)
    }
}

// ── Synthesis ──

fn default_tts_base_url() -> String {
    "https://global.api.murf.ai".to_string()
}

fn default_voice_id() -> String {
    "en-US-miles".to_string()
}

fn default_style() -> String {
    "Conversational".to_string()
}

fn default_sample_rate() -> u32 {
    24_000
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_style")]
    pub style: String,
    /// Speaking-rate offset; 0 is neutral.
    #[serde(default)]
    pub rate: i32,
    /// Pitch offset; 0 is neutral.
    #[serde(default)]
    pub pitch: i32,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub channel_type: ChannelLayout,
    #[serde(default)]
    pub model_version: SynthesisModel,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_base_url(),
            api_key: String::new(),
            voice_id: default_voice_id(),
            style: default_style(),
            rate: 0,
            pitch: 0,
            sample_rate: default_sample_rate(),
            format: AudioFormat::default(),
            channel_type: ChannelLayout::default(),
            model_version: SynthesisModel::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("style", &self.style)
            .field("rate", &self.rate)
            .field("pitch", &self.pitch)
            .field("sample_rate", &self.sample_rate)
            .field("format", &self.format)
            .field("channel_type", &self.channel_type)
            .field("model_version", &self.model_version)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), VoiceError> {
        require_non_empty("synthesis.base_url", &self.base_url)?;
        require_non_empty("synthesis.voice_id", &self.voice_id)?;
        require_non_empty("synthesis.style", &self.style)?;
        if !RECOGNIZED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(VoiceError::Config(format!(
                "synthesis.sample_rate {} is not one of {:?}",
                self.sample_rate, RECOGNIZED_SAMPLE_RATES
            )));
        }
        if !(-50..=50).contains(&self.rate) || !(-50..=50).contains(&self.pitch) {
            return Err(VoiceError::Config(
                "synthesis.rate and synthesis.pitch must be between -50 and 50".to_string(),
            ));
        }
        require_timeout("synthesis.timeout_ms", self.timeout_ms)
    }
}

// ── Conversation ──

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Content of the system turn every conversation starts with.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Drop the turns a failed run appended instead of keeping them.
    #[serde(default)]
    pub rollback_on_failure: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            rollback_on_failure: false,
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), VoiceError> {
    if value.trim().is_empty() {
        return Err(VoiceError::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_timeout(field: &str, timeout_ms: u64) -> Result<(), VoiceError> {
    if timeout_ms == 0 {
        return Err(VoiceError::Config(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}
