//! Speech synthesis output options.
//!
//! The synthesis service accepts a fixed vocabulary for its output format,
//! channel layout, and model generation. These enums mirror that vocabulary
//! so configuration files are checked at load time instead of at the first
//! request.

use serde::{Deserialize, Serialize};

/// Sample rates (Hz) the synthesis service accepts.
pub const RECOGNIZED_SAMPLE_RATES: &[u32] = &[8000, 24000, 44100, 48000];

/// Encoded audio container produced by synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AudioFormat {
    /// MPEG-1 Layer III. Compact, plays everywhere.
    #[default]
    Mp3,
    Wav,
    Flac,
    Alaw,
    Ulaw,
    Ogg,
    /// Raw signed 16-bit PCM.
    Pcm,
}

impl AudioFormat {
    /// MIME type to announce when returning audio in this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Alaw | Self::Ulaw => "audio/basic",
            Self::Ogg => "audio/ogg",
            Self::Pcm => "audio/L16",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Alaw => "alaw",
            Self::Ulaw => "ulaw",
            Self::Ogg => "ogg",
            Self::Pcm => "pcm",
        }
    }
}

/// Channel layout of synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelLayout {
    #[default]
    Mono,
    Stereo,
}

/// Synthesis model generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SynthesisModel {
    /// Low-latency streaming model.
    #[default]
    Falcon,
    Gen2,
}
