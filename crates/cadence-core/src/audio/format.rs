//! Output format catalogue.

use crate::error::{CadenceError, CadenceResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported response formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV container with 16-bit PCM (uncompressed)
    Wav,
    /// MP3 (lossy compression)
    Mp3,
    /// Opus in an Ogg container (lossy compression)
    Opus,
    /// FLAC (lossless compression)
    Flac,
    /// AAC in ADTS framing (lossy compression)
    Aac,
    /// Raw 16-bit little-endian samples, no container
    Pcm,
}

impl AudioFormat {
    /// Get file extension for the format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::Pcm => "pcm",
        }
    }

    /// Get MIME type for the format
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/ogg",
            Self::Flac => "audio/flac",
            Self::Aac => "audio/aac",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Check if the format is lossy
    #[must_use]
    pub const fn is_lossy(self) -> bool {
        matches!(self, Self::Mp3 | Self::Opus | Self::Aac)
    }

    /// Check if the format bypasses any container
    #[must_use]
    pub const fn is_raw(self) -> bool {
        matches!(self, Self::Pcm)
    }

    /// Get human-readable description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Wav => "Waveform Audio File Format",
            Self::Mp3 => "MPEG Audio Layer III",
            Self::Opus => "Opus in Ogg",
            Self::Flac => "Free Lossless Audio Codec",
            Self::Aac => "Advanced Audio Coding (ADTS)",
            Self::Pcm => "Raw 16-bit PCM",
        }
    }

    /// Check if an encoder for this format is compiled in
    #[must_use]
    pub const fn has_builtin_encoder(self) -> bool {
        match self {
            Self::Wav | Self::Pcm => true,
            Self::Mp3 => cfg!(feature = "mp3"),
            Self::Opus => cfg!(feature = "opus"),
            Self::Flac => cfg!(feature = "flac"),
            Self::Aac => cfg!(feature = "aac"),
        }
    }

    /// Get all formats
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Wav,
            Self::Mp3,
            Self::Opus,
            Self::Flac,
            Self::Aac,
            Self::Pcm,
        ]
    }
}

impl FromStr for AudioFormat {
    type Err = CadenceError;

    fn from_str(s: &str) -> CadenceResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(Self::Wav),
            "mp3" => Ok(Self::Mp3),
            "opus" => Ok(Self::Opus),
            "flac" => Ok(Self::Flac),
            "aac" => Ok(Self::Aac),
            "pcm" => Ok(Self::Pcm),
            _ => Err(CadenceError::unsupported_format(s)),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
