//! Shared types for the Parley voice relay.
//!
//! This crate holds the conversation data model (roles, turns, the latest
//! exchange view) and the latency report attached to every synthesized
//! reply. It performs no I/O; `parley-voice` and `parley-server` both build
//! on it so the wire shapes stay in one place.

pub mod voice;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use voice::{AudioFormat, ChannelLayout, SynthesisModel, RECOGNIZED_SAMPLE_RATES};

/// The speaker of a conversation turn.
///
/// Serialised lowercase, which is the role tag chat-completion services
/// expect in their message arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The persona prompt that opens every conversation.
    System,
    /// Transcribed speech from the caller.
    User,
    /// A reply produced by the dialogue model.
    Assistant,
}

impl Role {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One exchange unit in a conversation.
///
/// Turns are immutable once created; fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The most recent user/assistant pair of the active conversation.
///
/// Both fields are empty strings when no exchange has happened yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestExchange {
    pub user: String,
    pub ai: String,
}

impl LatestExchange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.ai.is_empty()
    }
}

/// Per-stage timings of one pipeline run, in whole milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub stt_ms: u64,
    pub llm_ms: u64,
    pub tts_ms: u64,
    pub total_ms: u64,
}

impl LatencyReport {
    pub fn from_durations(stt: Duration, llm: Duration, tts: Duration, total: Duration) -> Self {
        Self {
            stt_ms: round_millis(stt),
            llm_ms: round_millis(llm),
            tts_ms: round_millis(tts),
            total_ms: round_millis(total),
        }
    }
}

/// Rounds a duration to the nearest whole millisecond.
pub fn round_millis(duration: Duration) -> u64 {
    (duration.as_secs_f64() * 1000.0).round() as u64
}
