//! FLAC stream writer.
//!
//! The STREAMINFO block at the head of a FLAC file records the total sample
//! count and an MD5 of the decoded audio, so the stream is encoded once at
//! `finish`. `write` only accumulates samples.

use super::encoder::FormatWriter;
use crate::error::{CadenceError, CadenceResult};
use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;
use flacenc::source::MemSource;
use tracing::debug;

const BITS_PER_SAMPLE: usize = 16;

/// Lowest and highest rates a STREAMINFO block can carry
const MIN_RATE: u32 = 1;
const MAX_RATE: u32 = 655_350;

/// FLAC writer that emits the whole stream on finish
pub struct FlacWriter {
    sample_rate: u32,
    channels: u16,
    pending: Vec<i32>,
}

impl std::fmt::Debug for FlacWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlacWriter")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl FlacWriter {
    /// Create a writer
    ///
    /// # Errors
    ///
    /// Returns an audio processing error for a rate or channel count FLAC
    /// cannot describe.
    pub fn new(sample_rate: u32, channels: u16) -> CadenceResult<Self> {
        if !(MIN_RATE..=MAX_RATE).contains(&sample_rate) {
            return Err(CadenceError::audio_processing(format!(
                "FLAC does not support a {sample_rate} Hz sample rate"
            )));
        }
        if !(1..=8).contains(&channels) {
            return Err(CadenceError::audio_processing(format!(
                "FLAC does not support {channels} channels"
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            pending: Vec::new(),
        })
    }
}

impl FormatWriter for FlacWriter {
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        self.pending.extend(samples.iter().map(|s| i32::from(*s)));
        Ok(Vec::new())
    }

    fn finish(&mut self) -> CadenceResult<Vec<u8>> {
        let config = flacenc::config::Encoder::default()
            .into_verified()
            .map_err(|e| CadenceError::audio_processing(format!("FLAC config rejected: {e:?}")))?;

        let samples = std::mem::take(&mut self.pending);
        let source = MemSource::from_samples(
            &samples,
            usize::from(self.channels),
            BITS_PER_SAMPLE,
            self.sample_rate as usize,
        );

        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| CadenceError::audio_processing(format!("FLAC encoding failed: {e:?}")))?;

        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| CadenceError::audio_processing(format!("FLAC write failed: {e:?}")))?;

        let bytes = sink.as_slice().to_vec();
        debug!(
            "Encoded {} samples into {} FLAC bytes",
            samples.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}
