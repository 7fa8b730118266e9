//! Voice name resolution.
//!
//! Requests name voices with the public catalogue (`alloy`, `echo`, ...),
//! while the synthesizer exposes its own style names (`F1`..`F5`,
//! `M1`..`M5`). Resolution never fails: an unknown name falls back to the
//! first style the backend offers.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Public voice names and the style each one maps to
pub const VOICE_MAP: &[(&str, &str)] = &[
    ("alloy", "F1"),
    ("echo", "M1"),
    ("fable", "M2"),
    ("onyx", "M3"),
    ("nova", "F2"),
    ("shimmer", "F3"),
    ("ash", "F4"),
    ("ballad", "F4"),
    ("cedar", "M4"),
    ("coral", "F5"),
    ("marin", "F5"),
    ("sage", "M4"),
    ("verse", "M5"),
];

/// Style used when the backend reports no styles at all
pub const FALLBACK_STYLE: &str = "F1";

/// Handle to a synthesizer voice style
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceStyle {
    name: Arc<str>,
}

impl VoiceStyle {
    /// Create a handle for a style name
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }

    /// Style name as the backend knows it
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for VoiceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which rule produced a style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceResolution {
    /// The request named a style the backend has
    Direct,
    /// The request used a public name with an available mapped style
    Mapped,
    /// Nothing matched, the default style was used
    Fallback,
}

/// Styles offered by the loaded backend
#[derive(Debug, Clone, Default)]
pub struct VoiceTable {
    available: Vec<VoiceStyle>,
}

impl VoiceTable {
    /// Build a table from the backend's style names, keeping their order
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            available: names.into_iter().map(|n| VoiceStyle::new(n.as_ref())).collect(),
        }
    }

    /// Available styles in backend order
    #[must_use]
    pub fn styles(&self) -> &[VoiceStyle] {
        &self.available
    }

    /// Check whether the backend offers a style
    #[must_use]
    pub fn contains(&self, style: &str) -> bool {
        self.find(style).is_some()
    }

    fn find(&self, style: &str) -> Option<&VoiceStyle> {
        self.available.iter().find(|s| s.name() == style)
    }

    /// Style mapped to a public voice name, if the name is known
    #[must_use]
    pub fn mapped_style(voice: &str) -> Option<&'static str> {
        let voice = voice.trim().to_ascii_lowercase();
        VOICE_MAP
            .iter()
            .find(|(name, _)| *name == voice)
            .map(|(_, style)| *style)
    }

    /// Resolve a requested name to a style
    #[must_use]
    pub fn resolve(&self, voice: &str) -> (VoiceStyle, VoiceResolution) {
        let (style, how) = if let Some(style) = self.find(voice) {
            (style.clone(), VoiceResolution::Direct)
        } else if let Some(style) = Self::mapped_style(voice).and_then(|s| self.find(s)) {
            (style.clone(), VoiceResolution::Mapped)
        } else {
            let style = self
                .available
                .first()
                .cloned()
                .unwrap_or_else(|| VoiceStyle::new(FALLBACK_STYLE));
            (style, VoiceResolution::Fallback)
        };

        debug!("Resolved voice '{}' to style {} ({:?})", voice, style, how);
        (style, how)
    }
}
