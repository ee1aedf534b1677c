//! Voice relay core for Parley.
//!
//! Turns one recorded utterance into one spoken reply by chaining three
//! hosted services: speech-to-text, a chat-completion model, and
//! text-to-speech. The [`PipelineCoordinator`] drives the stages in order,
//! keeps the shared [`TranscriptStore`] up to date, and reports per-stage
//! latency alongside the synthesized audio.
//!
//! Each remote service sits behind a trait ([`Transcriber`],
//! [`DialogueModel`], [`SpeechSynthesizer`]) so the coordinator can be
//! exercised with in-process stubs. The concrete HTTP clients are
//! [`DeepgramTranscriber`], [`GroqDialogue`] and [`MurfSynthesizer`].

pub mod config;
pub mod dialogue;
pub mod error;
pub mod pipeline;
pub mod stt;
pub mod transcript;
pub mod tts;

pub use config::{
    ConversationConfig, DialogueConfig, SynthesisConfig, TranscriptionConfig, VoiceConfig,
    DEFAULT_SYSTEM_PROMPT,
};
pub use dialogue::{DialogueModel, GroqDialogue};
pub use error::{PipelineError, VoiceError};
pub use pipeline::{PipelineCoordinator, PipelineResult, Stage};
pub use stt::{AudioUpload, DeepgramTranscriber, Transcriber};
pub use transcript::TranscriptStore;
pub use tts::{MurfSynthesizer, SpeechSynthesizer};
