//! Opus packets in an Ogg container.
//!
//! Samples are buffered into 20 ms frames. Every `write` closes the Ogg page
//! it touched so bytes reach the client without waiting for a full page.

use super::encoder::FormatWriter;
use crate::error::{CadenceError, CadenceResult};
use audiopus::{coder::Encoder, Application, Bitrate, Channels, SampleRate as OpusSampleRate};
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use tracing::trace;

/// Frame length in milliseconds
pub const FRAME_MS: u32 = 20;

/// Granule positions always count 48 kHz samples
const GRANULE_RATE: u64 = 48_000;

/// libopus encoder lookahead at 48 kHz
const PRE_SKIP: u16 = 312;

const MAX_PACKET: usize = 4000;

const VENDOR: &str = concat!("cadence ", env!("CARGO_PKG_VERSION"));

/// Streaming Ogg Opus writer
pub struct OggOpusWriter {
    encoder: Encoder,
    pages: PacketWriter<'static, Vec<u8>>,
    serial: u32,
    sample_rate: u32,
    channels: u16,
    frame_len: usize,
    pending: Vec<i16>,
    granule: u64,
    input_frames: u64,
    headers_written: bool,
    last_packet: Option<Vec<u8>>,
}

impl std::fmt::Debug for OggOpusWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OggOpusWriter")
            .field("serial", &self.serial)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("granule", &self.granule)
            .finish_non_exhaustive()
    }
}

fn opus_rate(sample_rate: u32) -> CadenceResult<OpusSampleRate> {
    match sample_rate {
        8000 => Ok(OpusSampleRate::Hz8000),
        12000 => Ok(OpusSampleRate::Hz12000),
        16000 => Ok(OpusSampleRate::Hz16000),
        24000 => Ok(OpusSampleRate::Hz24000),
        48000 => Ok(OpusSampleRate::Hz48000),
        other => Err(CadenceError::audio_processing(format!(
            "Opus does not support a {other} Hz sample rate"
        ))),
    }
}

fn opus_head(channels: u16, sample_rate: u32) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1);
    head.push(channels as u8);
    head.extend_from_slice(&PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&sample_rate.to_le_bytes());
    head.extend_from_slice(&0_i16.to_le_bytes());
    head.push(0);
    head
}

fn opus_tags() -> Vec<u8> {
    let mut tags = Vec::with_capacity(16 + VENDOR.len());
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
    tags.extend_from_slice(VENDOR.as_bytes());
    tags.extend_from_slice(&0_u32.to_le_bytes());
    tags
}

impl OggOpusWriter {
    /// Create a writer
    ///
    /// # Errors
    ///
    /// Returns an audio processing error for a rate Opus cannot encode or
    /// a rejected encoder setting.
    pub fn new(sample_rate: u32, channels: u16, bit_rate: u32) -> CadenceResult<Self> {
        let rate = opus_rate(sample_rate)?;
        let opus_channels = if channels == 2 {
            Channels::Stereo
        } else {
            Channels::Mono
        };

        let mut encoder = Encoder::new(rate, opus_channels, Application::Audio)
            .map_err(|e| CadenceError::audio_processing(format!("Opus encoder init failed: {e}")))?;
        encoder
            .set_bitrate(Bitrate::BitsPerSecond(bit_rate as i32))
            .map_err(|e| CadenceError::audio_processing(format!("Opus bitrate rejected: {e}")))?;

        let frame_len = (sample_rate * FRAME_MS / 1000) as usize * usize::from(channels);

        Ok(Self {
            encoder,
            pages: PacketWriter::new(Vec::new()),
            serial: uuid::Uuid::new_v4().as_u128() as u32,
            sample_rate,
            channels,
            frame_len,
            pending: Vec::with_capacity(frame_len),
            granule: u64::from(PRE_SKIP),
            input_frames: 0,
            headers_written: false,
            last_packet: None,
        })
    }

    fn ogg_err(e: std::io::Error) -> CadenceError {
        CadenceError::audio_processing(format!("Ogg page write failed: {e}"))
    }

    fn write_headers(&mut self) -> CadenceResult<()> {
        if self.headers_written {
            return Ok(());
        }
        self.headers_written = true;
        self.pages
            .write_packet(
                opus_head(self.channels, self.sample_rate),
                self.serial,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .map_err(Self::ogg_err)?;
        self.pages
            .write_packet(opus_tags(), self.serial, PacketWriteEndInfo::EndPage, 0)
            .map_err(Self::ogg_err)
    }

    fn encode_frame(&mut self, frame: &[i16]) -> CadenceResult<Vec<u8>> {
        let mut packet = vec![0_u8; MAX_PACKET];
        let len = self
            .encoder
            .encode(frame, &mut packet)
            .map_err(|e| CadenceError::audio_processing(format!("Opus encoding failed: {e}")))?;
        packet.truncate(len);
        Ok(packet)
    }

    /// Granule advance for one frame
    fn frame_granules(&self) -> u64 {
        u64::from(FRAME_MS) * GRANULE_RATE / 1000
    }

    /// Queue a packet, holding the newest back so the last one can end the stream
    fn push_packet(&mut self, packet: Vec<u8>) -> CadenceResult<()> {
        if let Some(previous) = self.last_packet.replace(packet) {
            self.granule += self.frame_granules();
            self.pages
                .write_packet(previous, self.serial, PacketWriteEndInfo::NormalPacket, self.granule)
                .map_err(Self::ogg_err)?;
        }
        Ok(())
    }

    fn drain_pages(&mut self) -> Vec<u8> {
        std::mem::take(self.pages.inner_mut())
    }
}

impl FormatWriter for OggOpusWriter {
    fn write(&mut self, samples: &[i16]) -> CadenceResult<Vec<u8>> {
        self.write_headers()?;
        self.input_frames += (samples.len() / usize::from(self.channels)) as u64;
        self.pending.extend_from_slice(samples);

        let mut encoded = 0;
        while self.pending.len() >= self.frame_len {
            let frame: Vec<i16> = self.pending.drain(..self.frame_len).collect();
            let packet = self.encode_frame(&frame)?;
            self.push_packet(packet)?;
            encoded += 1;
        }

        // close the page so this call's packets are released
        if encoded > 0 {
            if let Some(previous) = self.last_packet.take() {
                self.granule += self.frame_granules();
                self.pages
                    .write_packet(previous, self.serial, PacketWriteEndInfo::EndPage, self.granule)
                    .map_err(Self::ogg_err)?;
            }
        }
        trace!("Encoded {} Opus frames", encoded);
        Ok(self.drain_pages())
    }

    fn finish(&mut self) -> CadenceResult<Vec<u8>> {
        self.write_headers()?;

        // zero-pad the tail, or emit one silent frame so the stream has an end page
        if !self.pending.is_empty() || self.last_packet.is_none() {
            let mut frame = std::mem::take(&mut self.pending);
            frame.resize(self.frame_len, 0);
            let packet = self.encode_frame(&frame)?;
            self.push_packet(packet)?;
        }

        if let Some(last) = self.last_packet.take() {
            // the final granule counts real input only, trimming padding on decode
            let input = self.input_frames * GRANULE_RATE / u64::from(self.sample_rate);
            let end = (u64::from(PRE_SKIP) + input).max(self.granule);
            self.pages
                .write_packet(last, self.serial, PacketWriteEndInfo::EndStream, end)
                .map_err(Self::ogg_err)?;
        }
        Ok(self.drain_pages())
    }
}
