//! Per-response incremental encoder.
//!
//! A [`StreamEncoder`] turns fixed-point chunks into bytes of one continuous
//! container stream. Each call returns only the bytes that became ready
//! during that call, so concatenating every `write` result followed by the
//! `finalize` result yields one decodable file.

use super::format::AudioFormat;
use super::wav::WavStreamWriter;
use super::AudioSamples;
use crate::error::{CadenceError, CadenceResult};
use tracing::{debug, warn};

/// Codec or container backend behind a [`StreamEncoder`]
///
/// Implementations buffer as they need but must hand back every byte they
/// have produced from each call.
pub trait FormatWriter: Send {
    /// Encode samples and return the bytes produced by this call
    ///
    /// # Errors
    ///
    /// Returns an error if the codec rejects the input.
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>>;

    /// Flush buffered samples and write the trailer
    ///
    /// # Errors
    ///
    /// Returns an error if the codec fails to flush.
    fn finish(&mut self) -> CadenceResult<Vec<u8>>;
}

/// Lifecycle of a [`StreamEncoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// Nothing written yet
    Created,
    /// At least one chunk accepted
    Writing,
    /// Trailer written, no more input accepted
    Finalized,
    /// Buffers released
    Closed,
}

/// Default bit rate for lossy codecs
pub const DEFAULT_BIT_RATE: u32 = 128_000;

/// Stateful encoder owned by one response
pub struct StreamEncoder {
    format: AudioFormat,
    sample_rate: u32,
    channels: u16,
    position: u64,
    state: EncoderState,
    writer: Option<Box<dyn FormatWriter>>,
}

impl std::fmt::Debug for StreamEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEncoder")
            .field("format", &self.format)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("position", &self.position)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StreamEncoder {
    /// Create an encoder with the default lossy bit rate
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` when no backend for `format` is compiled
    /// in, or `InvalidInput` for an unusable channel count.
    pub fn new(format: AudioFormat, sample_rate: u32, channels: u16) -> CadenceResult<Self> {
        Self::with_bit_rate(format, sample_rate, channels, DEFAULT_BIT_RATE)
    }

    /// Create an encoder with an explicit lossy bit rate
    ///
    /// # Errors
    ///
    /// Same as [`StreamEncoder::new`].
    pub fn with_bit_rate(
        format: AudioFormat,
        sample_rate: u32,
        channels: u16,
        bit_rate: u32,
    ) -> CadenceResult<Self> {
        if !(1..=2).contains(&channels) {
            return Err(CadenceError::invalid_input(format!(
                "Channels must be 1 or 2, got {channels}"
            )));
        }
        if sample_rate == 0 {
            return Err(CadenceError::invalid_input("Sample rate must be positive"));
        }

        let writer = Self::builtin_writer(format, sample_rate, channels, bit_rate)?;
        debug!(
            "Created {} encoder at {} Hz, {} channel(s)",
            format, sample_rate, channels
        );

        Ok(Self {
            format,
            sample_rate,
            channels,
            position: 0,
            state: EncoderState::Created,
            writer,
        })
    }

    /// Create an encoder around a caller-supplied backend
    ///
    /// Used for formats without a built-in codec such as FLAC or AAC.
    #[must_use]
    pub fn with_writer(
        format: AudioFormat,
        sample_rate: u32,
        channels: u16,
        writer: Box<dyn FormatWriter>,
    ) -> Self {
        Self {
            format,
            sample_rate,
            channels,
            position: 0,
            state: EncoderState::Created,
            writer: Some(writer),
        }
    }

    #[allow(unused_variables)]
    fn builtin_writer(
        format: AudioFormat,
        sample_rate: u32,
        channels: u16,
        bit_rate: u32,
    ) -> CadenceResult<Option<Box<dyn FormatWriter>>> {
        match format {
            AudioFormat::Pcm => Ok(None),
            AudioFormat::Wav => Ok(Some(Box::new(WavStreamWriter::new(sample_rate, channels)))),
            #[cfg(feature = "mp3")]
            AudioFormat::Mp3 => Ok(Some(Box::new(super::mp3::Mp3Writer::new(
                sample_rate,
                channels,
                bit_rate,
            )?))),
            #[cfg(feature = "opus")]
            AudioFormat::Opus => Ok(Some(Box::new(super::opus::OggOpusWriter::new(
                sample_rate,
                channels,
                bit_rate,
            )?))),
            #[cfg(feature = "flac")]
            AudioFormat::Flac => Ok(Some(Box::new(super::flac::FlacWriter::new(
                sample_rate,
                channels,
            )?))),
            #[cfg(feature = "aac")]
            AudioFormat::Aac => Ok(Some(Box::new(super::aac::AdtsAacWriter::new(
                sample_rate,
                channels,
                bit_rate,
            )?))),
            #[allow(unreachable_patterns)]
            other => Err(CadenceError::unsupported_format(other.extension())),
        }
    }

    /// Output format
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample frames accepted so far
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> EncoderState {
        self.state
    }

    /// Encode a chunk of samples in either representation
    ///
    /// # Errors
    ///
    /// See [`StreamEncoder::write`].
    pub fn write_samples(&mut self, samples: &AudioSamples) -> CadenceResult<Vec<u8>> {
        match samples {
            AudioSamples::I16(samples) => self.write(samples),
            AudioSamples::F32(_) => self.write(&samples.to_i16()),
        }
    }

    /// Encode fixed-point samples and return the bytes ready now
    ///
    /// The result may be empty while a codec buffers internally.
    ///
    /// # Errors
    ///
    /// Returns `EncoderStateError` after `finalize` or `close`, or the
    /// backend's error if encoding fails.
    pub fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        match self.state {
            EncoderState::Finalized => {
                return Err(CadenceError::encoder_state("write called after finalize"))
            }
            EncoderState::Closed => {
                return Err(CadenceError::encoder_state("write called after close"))
            }
            EncoderState::Created | EncoderState::Writing => {}
        }

        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let bytes = match self.writer.as_mut() {
            None => samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            Some(writer) => writer.write(samples)?,
        };

        self.position += (samples.len() / usize::from(self.channels)) as u64;
        self.state = EncoderState::Writing;
        Ok(bytes)
    }

    /// Flush the codec and return the trailing bytes
    ///
    /// # Errors
    ///
    /// Returns `EncoderStateError` when called a second time or after
    /// `close`, or the backend's error if flushing fails.
    pub fn finalize(&mut self) -> CadenceResult<Vec<u8>> {
        match self.state {
            EncoderState::Finalized => {
                return Err(CadenceError::encoder_state("finalize called twice"))
            }
            EncoderState::Closed => {
                return Err(CadenceError::encoder_state("finalize called after close"))
            }
            EncoderState::Created | EncoderState::Writing => {}
        }

        self.state = EncoderState::Finalized;
        let Some(writer) = self.writer.as_mut() else {
            return Ok(Vec::new());
        };

        writer.finish().map_err(|e| {
            warn!("Error flushing {} encoder: {}", self.format, e);
            e
        })
    }

    /// Release codec buffers; safe to call repeatedly
    pub fn close(&mut self) {
        if self.state != EncoderState::Closed {
            debug!(
                "Closing {} encoder after {} samples",
                self.format, self.position
            );
        }
        self.writer = None;
        self.state = EncoderState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_passthrough() {
        let mut encoder = StreamEncoder::new(AudioFormat::Pcm, 24_000, 1).unwrap();
        let bytes = encoder.write(&[1, -2, 256]).unwrap();
        assert_eq!(bytes, vec![1, 0, 0xFE, 0xFF, 0, 1]);
        assert_eq!(encoder.position(), 3);
        assert_eq!(encoder.state(), EncoderState::Writing);
        assert!(encoder.finalize().unwrap().is_empty());
    }

    #[test]
    fn test_write_float_samples() {
        let mut encoder = StreamEncoder::new(AudioFormat::Pcm, 24_000, 1).unwrap();
        let bytes = encoder
            .write_samples(&AudioSamples::F32(vec![1.0, -1.0]))
            .unwrap();
        assert_eq!(bytes, [32767_i16.to_le_bytes(), (-32767_i16).to_le_bytes()].concat());
    }

    #[test]
    fn test_empty_write_keeps_state() {
        let mut encoder = StreamEncoder::new(AudioFormat::Wav, 24_000, 1).unwrap();
        assert!(encoder.write(&[]).unwrap().is_empty());
        assert_eq!(encoder.state(), EncoderState::Created);
    }

    #[test]
    fn test_write_after_finalize_fails() {
        let mut encoder = StreamEncoder::new(AudioFormat::Wav, 24_000, 1).unwrap();
        encoder.write(&[0; 10]).unwrap();
        encoder.finalize().unwrap();

        let err = encoder.write(&[0; 10]).unwrap_err();
        assert!(matches!(err, CadenceError::EncoderStateError { .. }));
    }

    #[test]
    fn test_double_finalize_fails() {
        let mut encoder = StreamEncoder::new(AudioFormat::Pcm, 24_000, 1).unwrap();
        encoder.finalize().unwrap();
        let err = encoder.finalize().unwrap_err();
        assert_eq!(err, CadenceError::encoder_state("finalize called twice"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut encoder = StreamEncoder::new(AudioFormat::Wav, 24_000, 1).unwrap();
        encoder.close();
        encoder.close();
        assert_eq!(encoder.state(), EncoderState::Closed);
        assert!(encoder.write(&[1]).is_err());
        assert!(encoder.finalize().is_err());

        let mut finalized = StreamEncoder::new(AudioFormat::Pcm, 24_000, 1).unwrap();
        finalized.finalize().unwrap();
        finalized.close();
        finalized.close();
    }

    #[test]
    fn test_invalid_layout_rejected() {
        assert!(StreamEncoder::new(AudioFormat::Wav, 24_000, 3).is_err());
    }

    #[cfg(not(feature = "flac"))]
    #[test]
    fn test_flac_rejected_without_backend() {
        let err = StreamEncoder::new(AudioFormat::Flac, 24_000, 1).unwrap_err();
        assert_eq!(err, CadenceError::unsupported_format("flac"));
    }

    #[cfg(not(feature = "aac"))]
    #[test]
    fn test_aac_rejected_without_backend() {
        let err = StreamEncoder::new(AudioFormat::Aac, 24_000, 1).unwrap_err();
        assert_eq!(err, CadenceError::unsupported_format("aac"));
    }

    /// Write two chunks then finalize, returning the concatenated stream
    fn encode_stream(format: AudioFormat) -> Vec<u8> {
        let tone: Vec<i16> = (0..12_000)
            .map(|i| ((i as f32 * 0.05).sin() * 8000.0) as i16)
            .collect();
        let mut encoder = StreamEncoder::new(format, 24_000, 1).unwrap();
        let mut bytes = encoder.write(&tone).unwrap();
        bytes.extend(encoder.write(&tone).unwrap());
        bytes.extend(encoder.finalize().unwrap());
        assert_eq!(encoder.position(), 24_000);
        assert_eq!(encoder.state(), EncoderState::Finalized);
        bytes
    }

    #[test]
    fn test_wav_stream_is_one_file() {
        let bytes = encode_stream(AudioFormat::Wav);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + 48_000);
        assert_eq!(bytes.windows(4).filter(|w| *w == b"RIFF").count(), 1);
    }

    #[cfg(feature = "mp3")]
    #[test]
    fn test_mp3_stream_is_one_file() {
        let bytes = encode_stream(AudioFormat::Mp3);
        assert!(bytes.len() > 1_000);
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes[1] & 0xE0, 0xE0);
    }

    #[cfg(feature = "opus")]
    #[test]
    fn test_opus_stream_is_one_file() {
        let bytes = encode_stream(AudioFormat::Opus);
        assert_eq!(&bytes[0..4], b"OggS");
        assert_eq!(bytes.windows(8).filter(|w| *w == b"OpusHead").count(), 1);
        assert_eq!(bytes.windows(8).filter(|w| *w == b"OpusTags").count(), 1);
    }

    #[cfg(feature = "flac")]
    #[test]
    fn test_flac_stream_is_one_file() {
        let bytes = encode_stream(AudioFormat::Flac);
        assert_eq!(&bytes[0..4], b"fLaC");
        assert_eq!(bytes.windows(4).filter(|w| *w == b"fLaC").count(), 1);
    }

    #[cfg(feature = "aac")]
    #[test]
    fn test_aac_stream_is_one_file() {
        let bytes = encode_stream(AudioFormat::Aac);
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes[1] & 0xF0, 0xF0);
        assert!(bytes.len() > 1_000);
    }

    struct CountingWriter {
        pending: usize,
    }

    impl FormatWriter for CountingWriter {
        fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
            self.pending += samples.len();
            if self.pending >= 4 {
                let ready = vec![0xAA; self.pending / 4];
                self.pending %= 4;
                Ok(ready)
            } else {
                Ok(Vec::new())
            }
        }

        fn finish(&mut self) -> CadenceResult<Vec<u8>> {
            Ok(vec![0xFF; usize::from(self.pending > 0)])
        }
    }

    #[test]
    fn test_custom_writer_buffers() {
        let mut encoder = StreamEncoder::with_writer(
            AudioFormat::Flac,
            24_000,
            1,
            Box::new(CountingWriter { pending: 0 }),
        );
        assert!(encoder.write(&[0; 3]).unwrap().is_empty());
        assert_eq!(encoder.write(&[0; 6]).unwrap(), vec![0xAA; 2]);
        assert_eq!(encoder.finalize().unwrap(), vec![0xFF]);
        assert_eq!(encoder.position(), 9);
    }
}
