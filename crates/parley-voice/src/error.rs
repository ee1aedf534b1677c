use thiserror::Error;

/// Failure of a single remote call or of configuration validation.
///
/// Client wrappers convert every transport error and non-success status
/// into one of these variants; raw `reqwest` errors never escape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("Dialogue error: {0}")]
    Dialogue(String),

    #[error("TTS error: {0}")]
    Tts(String),
}

impl VoiceError {
    /// Returns the underlying cause message without the variant prefix.
    pub fn cause(&self) -> &str {
        match self {
            Self::Config(msg) | Self::Stt(msg) | Self::Dialogue(msg) | Self::Tts(msg) => msg,
        }
    }
}

/// Outcome of a pipeline run that did not produce audio.
///
/// The `Display` text is the message returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Transcription yielded no usable text. The transcript is untouched.
    #[error("Could not understand audio.")]
    NoSpeechDetected,

    /// The completion call failed. The user turn stays appended unless
    /// rollback is enabled.
    #[error("Brain Error: {0}")]
    Dialogue(String),

    /// The synthesis call failed after both turns were appended.
    #[error("{}", synthesis_message(.0))]
    Synthesis(String),
    /// The runtime stopped the run's task before it finished.
    #[error("Pipeline run was interrupted")]
    Interrupted,
}

fn synthesis_message(cause: &str) -> &str {
    if cause.is_empty() {
        "Voice Generation Failed"
    } else {
        cause
    }
}

impl PipelineError {
    /// `true` when the caller's input was at fault (4xx), `false` for
    /// downstream failures (5xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NoSpeechDetected)
    }
}
