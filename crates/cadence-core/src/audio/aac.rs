//! AAC-LC in ADTS framing.
//!
//! Each ADTS frame carries its own header, so frames are released as soon
//! as the encoder produces them.

use super::encoder::FormatWriter;
use crate::error::{CadenceError, CadenceResult};
use fdk_aac::enc::{BitRate, ChannelMode, Encoder, EncoderParams, Transport};
use tracing::trace;

/// Silent frames fed on finish to drain the encoder lookahead
const FLUSH_FRAMES: usize = 3;

/// Rates AAC-LC defines sampling frequency indices for
const SUPPORTED_RATES: [u32; 12] = [
    8000, 11025, 12000, 16000, 22050, 24000, 32000, 44100, 48000, 64000, 88200, 96000,
];

/// Streaming ADTS AAC writer
pub struct AdtsAacWriter {
    encoder: Encoder,
    sample_rate: u32,
    channels: u16,
    frame_len: usize,
    scratch: Vec<u8>,
    frames: usize,
}

impl std::fmt::Debug for AdtsAacWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdtsAacWriter")
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("frame_len", &self.frame_len)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

fn aac_err(context: &str, e: impl std::fmt::Debug) -> CadenceError {
    CadenceError::audio_processing(format!("{context}: {e:?}"))
}

impl AdtsAacWriter {
    /// Create a writer
    ///
    /// # Errors
    ///
    /// Returns an audio processing error for a rate AAC cannot encode, more
    /// than two channels, or a rejected encoder setting.
    pub fn new(sample_rate: u32, channels: u16, bit_rate: u32) -> CadenceResult<Self> {
        if !SUPPORTED_RATES.contains(&sample_rate) {
            return Err(CadenceError::audio_processing(format!(
                "AAC does not support a {sample_rate} Hz sample rate"
            )));
        }
        let mode = match channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::Stereo,
            other => {
                return Err(CadenceError::audio_processing(format!(
                    "AAC writer supports mono or stereo, not {other} channels"
                )))
            }
        };

        let encoder = Encoder::new(EncoderParams {
            bit_rate: BitRate::Cbr(bit_rate),
            sample_rate,
            transport: Transport::Adts,
            channels: mode,
        })
        .map_err(|e| aac_err("AAC encoder init failed", e))?;

        let info = encoder
            .info()
            .map_err(|e| aac_err("AAC encoder info unavailable", e))?;
        let frame_len = info.frameLength as usize * usize::from(channels);
        let scratch = vec![0_u8; (info.maxOutBufBytes as usize).max(1536 * usize::from(channels))];

        Ok(Self {
            encoder,
            sample_rate,
            channels,
            frame_len,
            scratch,
            frames: 0,
        })
    }

    /// Feed samples until the encoder stops taking input or producing frames
    fn encode(&mut self, mut input: &[i16]) -> CadenceResult<Vec<u8>> {
        let mut out = Vec::new();
        while !input.is_empty() {
            let step = self
                .encoder
                .encode(input, &mut self.scratch)
                .map_err(|e| aac_err("AAC encoding failed", e))?;
            if step.output_size > 0 {
                out.extend_from_slice(&self.scratch[..step.output_size]);
                self.frames += 1;
            }
            if step.input_consumed == 0 && step.output_size == 0 {
                break;
            }
            input = &input[step.input_consumed.min(input.len())..];
        }
        Ok(out)
    }
}

impl FormatWriter for AdtsAacWriter {
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        let bytes = self.encode(samples)?;
        trace!("AAC encoder released {} bytes", bytes.len());
        Ok(bytes)
    }

    fn finish(&mut self) -> CadenceResult<Vec<u8>> {
        let silence = vec![0_i16; self.frame_len * FLUSH_FRAMES];
        self.encode(&silence)
    }
}
