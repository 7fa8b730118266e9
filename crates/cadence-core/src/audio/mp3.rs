//! MP3 backend on LAME.

use super::encoder::FormatWriter;
use crate::error::{CadenceError, CadenceResult};
use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};

/// Constant bit rate LAME stream
pub struct Mp3Writer {
    encoder: Encoder,
    channels: u16,
}

impl std::fmt::Debug for Mp3Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mp3Writer")
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Nearest LAME bit rate at or above the request
fn lame_bitrate(bit_rate: u32) -> Bitrate {
    match bit_rate / 1000 {
        0..=64 => Bitrate::Kbps64,
        65..=96 => Bitrate::Kbps96,
        97..=112 => Bitrate::Kbps112,
        113..=128 => Bitrate::Kbps128,
        129..=160 => Bitrate::Kbps160,
        161..=192 => Bitrate::Kbps192,
        193..=256 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

impl Mp3Writer {
    /// Configure LAME for the stream
    ///
    /// # Errors
    ///
    /// Returns an audio processing error if LAME rejects a parameter.
    pub fn new(sample_rate: u32, channels: u16, bit_rate: u32) -> CadenceResult<Self> {
        let lame_err = |e| CadenceError::audio_processing(format!("LAME setup failed: {e:?}"));

        let mut builder = Builder::new()
            .ok_or_else(|| CadenceError::audio_processing("Failed to allocate LAME encoder"))?;
        builder.set_num_channels(channels as u8).map_err(lame_err)?;
        builder.set_sample_rate(sample_rate).map_err(lame_err)?;
        builder.set_brate(lame_bitrate(bit_rate)).map_err(lame_err)?;
        builder.set_quality(Quality::Good).map_err(lame_err)?;
        let encoder = builder.build().map_err(lame_err)?;

        Ok(Self { encoder, channels })
    }
}

impl FormatWriter for Mp3Writer {
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(samples.len()));
        let result = if self.channels == 1 {
            self.encoder.encode_to_vec(MonoPcm(samples), &mut out)
        } else {
            self.encoder.encode_to_vec(InterleavedPcm(samples), &mut out)
        };
        result.map_err(|e| CadenceError::audio_processing(format!("MP3 encoding failed: {e:?}")))?;
        Ok(out)
    }

    fn finish(&mut self) -> CadenceResult<Vec<u8>> {
        let mut out = Vec::with_capacity(7200);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut out)
            .map_err(|e| CadenceError::audio_processing(format!("MP3 flush failed: {e:?}")))?;
        Ok(out)
    }
}
