//! Streaming WAV/RIFF writer
//!
//! The total length is unknown while streaming, so the RIFF and data chunk
//! sizes carry the `0xFFFF_FFFF` marker that players treat as "read to end".

use super::encoder::FormatWriter;
use crate::error::CadenceResult;

/// Size marker used while the stream length is unknown
pub const UNKNOWN_LENGTH: u32 = u32::MAX;

/// Length of the canonical PCM header
pub const HEADER_LEN: usize = 44;

/// WAV stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample, always 16 here
    pub bit_depth: u16,
}

impl WavSpec {
    /// 16-bit PCM spec
    #[must_use]
    pub const fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bit_depth: 16,
        }
    }

    const fn bytes_per_sample(&self) -> u16 {
        self.bit_depth / 8
    }

    /// Bytes per second
    #[must_use]
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bytes_per_sample() as u32
    }

    /// Bytes per sample frame
    #[must_use]
    pub const fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    /// Header with unknown-length size fields
    #[must_use]
    pub fn streaming_header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_LEN);

        // RIFF chunk
        header.extend_from_slice(b"RIFF");
        header.extend_from_slice(&UNKNOWN_LENGTH.to_le_bytes());
        header.extend_from_slice(b"WAVE");

        // fmt chunk, format tag 1 = PCM
        header.extend_from_slice(b"fmt ");
        header.extend_from_slice(&16_u32.to_le_bytes());
        header.extend_from_slice(&1_u16.to_le_bytes());
        header.extend_from_slice(&self.channels.to_le_bytes());
        header.extend_from_slice(&self.sample_rate.to_le_bytes());
        header.extend_from_slice(&self.byte_rate().to_le_bytes());
        header.extend_from_slice(&self.block_align().to_le_bytes());
        header.extend_from_slice(&self.bit_depth.to_le_bytes());

        // data chunk
        header.extend_from_slice(b"data");
        header.extend_from_slice(&UNKNOWN_LENGTH.to_le_bytes());
        header
    }
}

/// [`FormatWriter`] emitting the header with the first write
#[derive(Debug)]
pub struct WavStreamWriter {
    spec: WavSpec,
    header_written: bool,
}

impl WavStreamWriter {
    /// Create a writer for 16-bit PCM
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            spec: WavSpec::pcm16(sample_rate, channels),
            header_written: false,
        }
    }

    /// Stream format
    #[must_use]
    pub const fn spec(&self) -> WavSpec {
        self.spec
    }

    fn take_header(&mut self) -> Vec<u8> {
        if self.header_written {
            Vec::new()
        } else {
            self.header_written = true;
            self.spec.streaming_header()
        }
    }
}

impl FormatWriter for WavStreamWriter {
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        let mut out = self.take_header();
        out.reserve(samples.len() * 2);
        for sample in samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(out)
    }

    fn finish(&mut self) -> CadenceResult<Vec<u8>> {
        // an empty stream still needs a header to be a valid file
        Ok(self.take_header())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = WavSpec::pcm16(24_000, 1).streaming_header();
        assert_eq!(header.len(), HEADER_LEN);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[4..8], &[0xFF; 4]);
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([header[24], header[25], header[26], header[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([header[28], header[29], header[30], header[31]]), 48_000);
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 2);
        assert_eq!(&header[36..40], b"data");
    }

    #[test]
    fn test_header_only_once() {
        let mut writer = WavStreamWriter::new(24_000, 1);
        let first = writer.write(&[1, 2]).unwrap();
        assert_eq!(first.len(), HEADER_LEN + 4);
        let second = writer.write(&[3]).unwrap();
        assert_eq!(second, vec![3, 0]);
        assert!(writer.finish().unwrap().is_empty());
    }

    #[test]
    fn test_finish_without_samples_writes_header() {
        let mut writer = WavStreamWriter::new(16_000, 2);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(writer.spec().block_align(), 4);
    }
}
