//! Audio conditioning and incremental encoding.

#[cfg(feature = "aac")]
pub mod aac;
pub mod encoder;
#[cfg(feature = "flac")]
pub mod flac;
pub mod format;
#[cfg(feature = "mp3")]
pub mod mp3;
#[cfg(feature = "opus")]
pub mod opus;
pub mod trim;
pub mod wav;

pub use encoder::{EncoderState, FormatWriter, StreamEncoder};
pub use format::AudioFormat;
pub use trim::AudioNormalizer;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scale a float sample in `[-1, 1]` to 16-bit fixed point, clipping
#[must_use]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Sample buffer in either model output or fixed-point form
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSamples {
    /// Float samples in `[-1, 1]` as produced by the synthesizer
    F32(Vec<f32>),
    /// 16-bit signed samples
    I16(Vec<i16>),
}

impl Default for AudioSamples {
    fn default() -> Self {
        Self::I16(Vec::new())
    }
}

impl AudioSamples {
    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(samples) => samples.len(),
            Self::I16(samples) => samples.len(),
        }
    }

    /// Check if the buffer holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if samples are already fixed point
    #[must_use]
    pub const fn is_fixed_point(&self) -> bool {
        matches!(self, Self::I16(_))
    }

    /// Copy out as 16-bit samples
    #[must_use]
    pub fn to_i16(&self) -> Vec<i16> {
        match self {
            Self::F32(samples) => samples.iter().copied().map(f32_to_i16).collect(),
            Self::I16(samples) => samples.clone(),
        }
    }

    /// Convert into 16-bit samples, reusing the buffer when possible
    #[must_use]
    pub fn into_i16(self) -> Vec<i16> {
        match self {
            Self::F32(samples) => samples.into_iter().map(f32_to_i16).collect(),
            Self::I16(samples) => samples,
        }
    }
}

impl From<Vec<f32>> for AudioSamples {
    fn from(samples: Vec<f32>) -> Self {
        Self::F32(samples)
    }
}

impl From<Vec<i16>> for AudioSamples {
    fn from(samples: Vec<i16>) -> Self {
        Self::I16(samples)
    }
}

/// Time span of one spoken word within a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    /// The word
    pub word: String,
    /// Start offset in seconds
    pub start_time: f64,
    /// End offset in seconds
    pub end_time: f64,
}

/// One unit of audio moving through normalize → trim → encode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioChunk {
    /// Sample data
    pub samples: AudioSamples,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Source text, empty for pauses
    pub text: String,
    /// Encoded bytes produced for this chunk
    pub output: Option<Vec<u8>>,
    /// Optional per-word alignment
    pub word_timestamps: Option<Vec<WordTimestamp>>,
}

impl AudioChunk {
    /// Create a chunk without encoded output or alignment
    pub fn new<S: Into<AudioSamples>, T: Into<String>>(samples: S, sample_rate: u32, text: T) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            text: text.into(),
            output: None,
            word_timestamps: None,
        }
    }

    /// Attach word alignment
    #[must_use]
    pub fn with_word_timestamps(mut self, timestamps: Vec<WordTimestamp>) -> Self {
        self.word_timestamps = Some(timestamps);
        self
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the chunk has no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.len() as f64 / f64::from(self.sample_rate))
    }

    /// Concatenate chunks into one fixed-point chunk
    ///
    /// The sample rate is taken from the first chunk. Word timestamps are
    /// shifted by the duration of everything before them. An empty input
    /// yields an empty chunk at the default sample rate.
    #[must_use]
    pub fn combine(chunks: Vec<Self>) -> Self {
        let Some(sample_rate) = chunks.first().map(|c| c.sample_rate) else {
            return Self::new(Vec::<i16>::new(), crate::DEFAULT_SAMPLE_RATE, "");
        };

        let total: usize = chunks.iter().map(Self::len).sum();
        let mut samples = Vec::with_capacity(total);
        let mut texts = Vec::new();
        let mut output: Option<Vec<u8>> = None;
        let mut timestamps: Option<Vec<WordTimestamp>> = None;

        for chunk in chunks {
            let offset = samples.len() as f64 / f64::from(sample_rate.max(1));
            if let Some(words) = chunk.word_timestamps {
                timestamps
                    .get_or_insert_with(Vec::new)
                    .extend(words.into_iter().map(|mut w| {
                        w.start_time += offset;
                        w.end_time += offset;
                        w
                    }));
            }
            if let Some(bytes) = chunk.output {
                output.get_or_insert_with(Vec::new).extend_from_slice(&bytes);
            }
            if !chunk.text.is_empty() {
                texts.push(chunk.text);
            }
            samples.extend(chunk.samples.into_i16());
        }

        Self {
            samples: AudioSamples::I16(samples),
            sample_rate,
            text: texts.join(" "),
            output,
            word_timestamps: timestamps,
        }
    }
}
