//! Text preparation: normalization and segmentation into synthesis units.

pub mod normalizer;
pub mod numbers;
pub mod segmenter;

pub use normalizer::TextNormalizer;
pub use segmenter::{smart_split, TextSegmenter};

use serde::{Deserialize, Serialize};

/// Kind discriminator for [`TextUnit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Text to synthesize
    Speech,
    /// Literal silence
    Pause,
}

/// One segment of a request, either speech or a pause directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TextUnit {
    /// A packed run of sentences
    Speech {
        /// Text passed to the synthesizer
        text: String,
    },
    /// Requested silence from a `[pause:N]` directive
    Pause {
        /// Duration in seconds
        seconds: f64,
    },
}

impl TextUnit {
    /// Create a speech unit
    pub fn speech<S: Into<String>>(text: S) -> Self {
        Self::Speech { text: text.into() }
    }

    /// Create a pause unit
    #[must_use]
    pub const fn pause(seconds: f64) -> Self {
        Self::Pause { seconds }
    }

    /// Unit kind
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        match self {
            Self::Speech { .. } => UnitKind::Speech,
            Self::Pause { .. } => UnitKind::Pause,
        }
    }

    /// Text content, empty for pauses
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Speech { text } => text,
            Self::Pause { .. } => "",
        }
    }

    /// Pause duration, `None` for speech
    #[must_use]
    pub const fn pause_seconds(&self) -> Option<f64> {
        match self {
            Self::Speech { .. } => None,
            Self::Pause { seconds } => Some(*seconds),
        }
    }

    /// Check if this is a pause unit
    #[must_use]
    pub const fn is_pause(&self) -> bool {
        matches!(self, Self::Pause { .. })
    }
}

/// Switches for [`TextNormalizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationOptions {
    /// Run the normalizer at all
    pub normalize: bool,
    /// Lowercase the output
    pub lowercase: bool,
    /// Spell out URL schemes
    pub url_normalization: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            lowercase: true,
            url_normalization: true,
        }
    }
}
