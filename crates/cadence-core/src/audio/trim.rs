//! Per-stream level normalization and silence-aware edge trimming.

use super::{AudioChunk, AudioSamples};
use crate::config::TrimConfig;
use crate::error::{CadenceError, CadenceResult};
use std::collections::HashMap;
use tracing::trace;

/// Silence kept before the first audible sample
pub const PAD_START_MS: f64 = 50.0;

/// Level below which a sample counts as silence
pub const DEFAULT_SILENCE_THRESHOLD_DB: f64 = -45.0;

/// Trims synthesized chunks for one response
///
/// The sample rate is bound by the first chunk seen. Later chunks at a
/// different rate are rejected.
#[derive(Debug, Clone)]
pub struct AudioNormalizer {
    sample_rate: Option<u32>,
    gap_trim_ms: f64,
    dynamic_pad_ms: f64,
    multipliers: HashMap<char, f64>,
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new(&TrimConfig::default())
    }
}

impl AudioNormalizer {
    /// Create a normalizer from trim settings
    #[must_use]
    pub fn new(config: &TrimConfig) -> Self {
        let multipliers = config
            .padding_multipliers
            .iter()
            .filter_map(|(key, value)| key.chars().next().map(|c| (c, *value)))
            .collect();

        Self {
            sample_rate: None,
            gap_trim_ms: config.gap_trim_ms,
            dynamic_pad_ms: config.dynamic_gap_trim_padding_ms,
            multipliers,
        }
    }

    /// Create a normalizer with its sample rate already bound
    #[must_use]
    pub fn with_sample_rate(config: &TrimConfig, sample_rate: u32) -> Self {
        let mut normalizer = Self::new(config);
        normalizer.sample_rate = Some(sample_rate);
        normalizer
    }

    /// Bound sample rate, if any chunk has been processed
    #[must_use]
    pub const fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Samples removed from each end of a synthesized chunk
    #[must_use]
    pub fn samples_to_trim(&self, sample_rate: u32) -> usize {
        (self.gap_trim_ms * f64::from(sample_rate) / 1000.0) as usize
    }

    /// Samples kept before the first audible sample
    #[must_use]
    pub fn samples_to_pad_start(sample_rate: u32) -> usize {
        (PAD_START_MS * f64::from(sample_rate) / 1000.0) as usize
    }

    fn bind_rate(&mut self, sample_rate: u32) -> CadenceResult<u32> {
        match self.sample_rate {
            None => {
                self.sample_rate = Some(sample_rate);
                Ok(sample_rate)
            }
            Some(bound) if bound == sample_rate => Ok(bound),
            Some(bound) => Err(CadenceError::audio_processing(format!(
                "Chunk sample rate {sample_rate} Hz differs from stream rate {bound} Hz"
            ))),
        }
    }

    /// Convert samples to 16-bit fixed point
    #[must_use]
    pub fn normalize(&self, samples: &AudioSamples) -> Vec<i16> {
        samples.to_i16()
    }

    /// Locate the audible range of a chunk, padded for natural pacing
    ///
    /// Returns `(0, len)` when nothing exceeds the threshold. The end pad
    /// scales with the chunk's trailing punctuation and shrinks with speed.
    #[must_use]
    pub fn find_non_silent_range(
        &self,
        samples: &[i16],
        sample_rate: u32,
        text: &str,
        speed: f32,
        threshold_db: f64,
        is_last_chunk: bool,
    ) -> (usize, usize) {
        let threshold = 32767.0 * 10_f64.powf(threshold_db / 20.0);
        let audible = |s: &i16| f64::from(*s).abs() > threshold;

        let (Some(first), Some(last)) = (
            samples.iter().position(audible),
            samples.iter().rposition(audible),
        ) else {
            return (0, samples.len());
        };

        let pad_start = Self::samples_to_pad_start(sample_rate);
        let multiplier = text
            .trim()
            .chars()
            .last()
            .and_then(|c| self.multipliers.get(&c).copied())
            .unwrap_or(1.0);

        let pad_end = if is_last_chunk {
            pad_start
        } else {
            let dynamic = (self.dynamic_pad_ms * f64::from(sample_rate) * multiplier / 1000.0) as usize;
            dynamic.saturating_sub(pad_start)
        };

        let speed = f64::from(speed).max(f64::EPSILON);
        let end_pad = (pad_end as f64 / speed).ceil() as usize;

        (
            first.saturating_sub(pad_start),
            last.saturating_add(end_pad).min(samples.len()),
        )
    }

    /// Normalize and trim a synthesized chunk in place
    ///
    /// # Errors
    ///
    /// Returns an audio processing error if the chunk's sample rate differs
    /// from the rate bound to this stream.
    pub fn trim(&mut self, chunk: &mut AudioChunk, speed: f32, is_last_chunk: bool) -> CadenceResult<()> {
        let sample_rate = self.bind_rate(chunk.sample_rate)?;
        let mut samples = std::mem::take(&mut chunk.samples).into_i16();

        let trim = self.samples_to_trim(sample_rate);
        let mut removed = 0;
        if samples.len() > 2 * trim {
            samples.truncate(samples.len() - trim);
            samples.drain(..trim);
            removed += trim;
        }

        let (start, end) = self.find_non_silent_range(
            &samples,
            sample_rate,
            &chunk.text,
            speed,
            DEFAULT_SILENCE_THRESHOLD_DB,
            is_last_chunk,
        );
        samples.truncate(end);
        samples.drain(..start);
        removed += start;

        if let Some(words) = chunk.word_timestamps.as_mut() {
            let shift = removed as f64 / f64::from(sample_rate);
            for word in words {
                word.start_time -= shift;
                word.end_time -= shift;
            }
        }

        trace!(
            "Trimmed chunk to {} samples ({} leading removed)",
            samples.len(),
            removed
        );
        chunk.samples = AudioSamples::I16(samples);
        Ok(())
    }

    /// Normalize a chunk in place without trimming, used for pause silence
    ///
    /// # Errors
    ///
    /// Returns an audio processing error on a sample rate mismatch.
    pub fn normalize_chunk(&mut self, chunk: &mut AudioChunk) -> CadenceResult<()> {
        self.bind_rate(chunk.sample_rate)?;
        if !chunk.samples.is_fixed_point() {
            let samples = std::mem::take(&mut chunk.samples).into_i16();
            chunk.samples = AudioSamples::I16(samples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::WordTimestamp;

    const RATE: u32 = 24_000;

    fn normalizer() -> AudioNormalizer {
        AudioNormalizer::default()
    }

    #[test]
    fn test_derived_constants() {
        let n = normalizer();
        assert_eq!(n.samples_to_trim(RATE), 24);
        assert_eq!(AudioNormalizer::samples_to_pad_start(RATE), 1200);
        assert_eq!(n.samples_to_trim(22_050), 22);
    }

    #[test]
    fn test_all_silent_length() {
        let mut n = normalizer();
        for len in [49_usize, 1000, 24_000] {
            let mut chunk = AudioChunk::new(vec![0_i16; len], RATE, "Hello.");
            n.trim(&mut chunk, 1.0, false).unwrap();
            assert_eq!(chunk.len(), len - 2 * n.samples_to_trim(RATE));
        }
    }

    #[test]
    fn test_short_chunk_not_edge_trimmed() {
        let mut n = normalizer();
        let mut chunk = AudioChunk::new(vec![0_i16; 48], RATE, "");
        n.trim(&mut chunk, 1.0, false).unwrap();
        assert_eq!(chunk.len(), 48);
    }

    #[test]
    fn test_range_padding() {
        let n = normalizer();
        let mut samples = vec![0_i16; 48_000];
        samples[10_000..20_000].fill(10_000);

        // '.' keeps the full 410 ms: 9840 - 1200 = 8640 samples after speech
        let (start, end) = n.find_non_silent_range(&samples, RATE, "Done.", 1.0, -45.0, false);
        assert_eq!(start, 10_000 - 1200);
        assert_eq!(end, 19_999 + 8640);

        // ',' scales to 0.8: 7872 - 1200 = 6672
        let (_, end) = n.find_non_silent_range(&samples, RATE, "Wait,", 1.0, -45.0, false);
        assert_eq!(end, 19_999 + 6672);

        // doubling speed halves the end pad
        let (_, end) = n.find_non_silent_range(&samples, RATE, "Done.", 2.0, -45.0, false);
        assert_eq!(end, 19_999 + 4320);

        // the last chunk only keeps the start pad
        let (_, end) = n.find_non_silent_range(&samples, RATE, "Done.", 1.0, -45.0, true);
        assert_eq!(end, 19_999 + 1200);
    }

    #[test]
    fn test_range_clamped_to_bounds() {
        let n = normalizer();
        let mut samples = vec![0_i16; 2000];
        samples[5] = -20_000;
        samples[1990] = 20_000;
        assert_eq!(
            n.find_non_silent_range(&samples, RATE, "", 1.0, -45.0, false),
            (0, 2000)
        );
    }

    #[test]
    fn test_trim_shifts_timestamps() {
        let mut n = normalizer();
        let mut samples = vec![0.0_f32; 24_000];
        samples[12_024..13_000].fill(0.5);
        let mut chunk = AudioChunk::new(samples, RATE, "Hi.").with_word_timestamps(vec![
            WordTimestamp {
                word: "hi".into(),
                start_time: 0.5,
                end_time: 0.55,
            },
        ]);

        n.trim(&mut chunk, 1.0, false).unwrap();
        assert!(chunk.samples.is_fixed_point());

        // 24 edge samples plus 12_000 - 1200 leading silence
        let removed = 24 + 10_800;
        let words = chunk.word_timestamps.unwrap();
        let expected = 0.5 - removed as f64 / f64::from(RATE);
        assert!((words[0].start_time - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sample_rate_bound_on_first_use() {
        let mut n = normalizer();
        assert_eq!(n.sample_rate(), None);

        let mut pause = AudioChunk::new(vec![0_i16; 100], RATE, "");
        n.normalize_chunk(&mut pause).unwrap();
        assert_eq!(n.sample_rate(), Some(RATE));
        assert_eq!(pause.len(), 100);

        let mut other = AudioChunk::new(vec![0.0_f32; 100], 16_000, "x");
        let err = n.trim(&mut other, 1.0, false).unwrap_err();
        assert_eq!(err.category(), "audio_processing");
    }
}
