//! Request orchestration: segment, synthesize, trim, encode, deliver.
//!
//! Each request gets one producer task that walks its units strictly in
//! order. Speech units wait for an admission slot and run on the shared
//! worker pool; pause units become silence without touching the model.
//! Encoded segments flow to the consumer over a bounded channel, and
//! dropping the consumer stops the producer at its next suspension point.

use crate::admission::AdmissionGate;
use crate::audio::{AudioChunk, AudioFormat, AudioNormalizer, StreamEncoder, WordTimestamp};
use crate::config::{PipelineConfig, TrimConfig};
use crate::engine::SynthesisEngine;
use crate::error::{CadenceError, CadenceResult};
use crate::metrics::{MetricsSink, StreamMetrics};
use crate::text::{TextSegmenter, TextUnit};
use crate::voice::VoiceStyle;
use crate::worker_pool::WorkerPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Longest silence a single pause directive may produce
pub const MAX_PAUSE_SECONDS: f64 = 600.0;

/// One synthesis request as seen by the orchestrator
#[derive(Debug, Clone)]
pub struct SpeechJob {
    /// Correlates logs, metrics and usage
    pub request_id: Uuid,
    /// Text to speak, already normalized
    pub text: String,
    /// Resolved voice style
    pub voice: VoiceStyle,
    /// Speaking rate multiplier
    pub speed: f32,
    /// Output container
    pub format: AudioFormat,
}

impl SpeechJob {
    /// Create a job at normal speed with a fresh request id
    pub fn new<S: Into<String>>(text: S, voice: VoiceStyle, format: AudioFormat) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            text: text.into(),
            voice,
            speed: 1.0,
            format,
        }
    }

    /// Set the speaking rate
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// What produced a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Synthesized speech
    Speech,
    /// Silence from a pause directive
    Pause,
    /// Bytes flushed by the encoder after the last unit
    Trailer,
}

/// Encoded bytes for one unit plus the audio they came from
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Position in the emitted sequence
    pub index: usize,
    /// Origin of the segment
    pub kind: SegmentKind,
    /// Trimmed fixed-point audio; `output` holds the encoded bytes
    pub chunk: AudioChunk,
}

impl AudioSegment {
    /// Encoded bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.chunk.output.as_deref().unwrap_or_default()
    }
}

/// Receiving end of a streamed response
///
/// Dropping it cancels the request.
#[derive(Debug)]
pub struct AudioStream {
    request_id: Uuid,
    format: AudioFormat,
    sample_rate: u32,
    rx: mpsc::Receiver<CadenceResult<AudioSegment>>,
}

impl AudioStream {
    /// Wait for the next segment; `None` once the stream has ended
    ///
    /// An `Err` item is always the last one.
    pub async fn next_segment(&mut self) -> Option<CadenceResult<AudioSegment>> {
        self.rx.recv().await
    }

    /// Read the stream to the end and concatenate its bytes
    ///
    /// # Errors
    ///
    /// Returns the error that ended the stream early.
    pub async fn collect_bytes(mut self) -> CadenceResult<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Some(segment) = self.next_segment().await {
            bytes.extend_from_slice(segment?.bytes());
        }
        Ok(bytes)
    }

    /// Request id
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Output format
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    /// Media type of the byte stream
    #[must_use]
    pub const fn media_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Sample rate of the encoded audio
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Fully buffered response
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Request id
    pub request_id: Uuid,
    /// Complete encoded file
    pub bytes: Vec<u8>,
    /// Concatenated fixed-point waveform
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Output format
    pub format: AudioFormat,
    /// Word alignment, when the backend provides it
    pub word_timestamps: Option<Vec<WordTimestamp>>,
    /// Latency figures
    pub metrics: StreamMetrics,
}

impl SynthesizedAudio {
    /// Playback duration
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Media type of `bytes`
    #[must_use]
    pub const fn media_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Drives requests through the pipeline
#[derive(Clone)]
pub struct SynthesisOrchestrator {
    engine: Arc<SynthesisEngine>,
    gate: AdmissionGate,
    pool: WorkerPool,
    config: PipelineConfig,
    trim: TrimConfig,
    bit_rate: u32,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for SynthesisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisOrchestrator")
            .field("engine", &self.engine)
            .field("gate", &self.gate.stats())
            .field("workers", &self.pool.threads())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SynthesisOrchestrator {
    /// Create an orchestrator with its own worker pool
    ///
    /// # Errors
    ///
    /// Returns a concurrency error if the worker pool cannot start.
    pub fn new(
        engine: Arc<SynthesisEngine>,
        gate: AdmissionGate,
        config: PipelineConfig,
        metrics: Arc<dyn MetricsSink>,
    ) -> CadenceResult<Self> {
        let pool = WorkerPool::new(config.resolved_workers())?;
        Ok(Self {
            engine,
            gate,
            pool,
            config,
            trim: TrimConfig::default(),
            bit_rate: crate::audio::encoder::DEFAULT_BIT_RATE,
            metrics,
        })
    }

    /// Use custom trim settings
    #[must_use]
    pub fn with_trim_config(mut self, trim: TrimConfig) -> Self {
        self.trim = trim;
        self
    }

    /// Use a custom lossy bit rate
    #[must_use]
    pub fn with_bit_rate(mut self, bit_rate: u32) -> Self {
        self.bit_rate = bit_rate;
        self
    }

    /// Shared admission gate
    #[must_use]
    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Engine handle
    #[must_use]
    pub const fn engine(&self) -> &Arc<SynthesisEngine> {
        &self.engine
    }

    /// Start a streamed response
    ///
    /// # Errors
    ///
    /// Fails before any synthesis when the format has no encoder or the
    /// speed is not a positive number.
    pub async fn stream(&self, job: SpeechJob) -> CadenceResult<AudioStream> {
        let (stream, _producer) = self.spawn(job, false)?;
        Ok(stream)
    }

    /// Produce the whole response before returning
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; failed units are skipped, not fatal.
    pub async fn synthesize(&self, job: SpeechJob) -> CadenceResult<SynthesizedAudio> {
        let request_id = job.request_id;
        let format = job.format;
        let (mut stream, producer) = self.spawn(job, true)?;

        let mut bytes = Vec::new();
        let mut chunks = Vec::new();
        while let Some(segment) = stream.next_segment().await {
            let segment = segment?;
            bytes.extend_from_slice(segment.bytes());
            if !segment.chunk.is_empty() {
                chunks.push(segment.chunk);
            }
        }
        let metrics = producer.await?;

        let combined = AudioChunk::combine(chunks);
        Ok(SynthesizedAudio {
            request_id,
            bytes,
            samples: combined.samples.into_i16(),
            sample_rate: stream.sample_rate(),
            format,
            word_timestamps: combined.word_timestamps,
            metrics,
        })
    }

    fn spawn(
        &self,
        job: SpeechJob,
        keep_empty: bool,
    ) -> CadenceResult<(AudioStream, JoinHandle<StreamMetrics>)> {
        if !job.speed.is_finite() || job.speed <= 0.0 {
            return Err(CadenceError::invalid_input(format!(
                "Speed must be a positive number, got {}",
                job.speed
            )));
        }

        let sample_rate = self.engine.sample_rate();
        let encoder = StreamEncoder::with_bit_rate(
            job.format,
            sample_rate,
            crate::DEFAULT_CHANNELS,
            self.bit_rate,
        )?;
        let units = TextSegmenter::new(self.config.max_chunk_length).split(&job.text);

        let (tx, rx) = mpsc::channel(self.config.channel_buffer.max(1));
        let span = info_span!("request", request_id = %job.request_id, format = %job.format);
        let stream = AudioStream {
            request_id: job.request_id,
            format: job.format,
            sample_rate,
            rx,
        };

        let producer = Producer {
            orchestrator: self.clone(),
            normalizer: AudioNormalizer::with_sample_rate(&self.trim, sample_rate),
            metrics: StreamMetrics::start(job.request_id),
            job,
            encoder,
            tx,
            keep_empty,
            next_index: 0,
        };
        let handle = tokio::spawn(producer.run(units).instrument(span));
        Ok((stream, handle))
    }
}

enum Flow {
    Completed,
    Cancelled,
}

type Rendered = Option<(SegmentKind, AudioChunk)>;

/// Per-request state owned by the producer task
struct Producer {
    orchestrator: SynthesisOrchestrator,
    job: SpeechJob,
    encoder: StreamEncoder,
    normalizer: AudioNormalizer,
    metrics: StreamMetrics,
    tx: mpsc::Sender<CadenceResult<AudioSegment>>,
    keep_empty: bool,
    next_index: usize,
}

impl Producer {
    async fn run(mut self, units: Vec<TextUnit>) -> StreamMetrics {
        info!("Processing {} units", units.len());

        match self.drive(units).await {
            Ok(Flow::Completed) => info!(
                "Request complete: {} segments, {} bytes",
                self.metrics.emitted_unit_count, self.metrics.bytes_emitted
            ),
            Ok(Flow::Cancelled) => info!(
                "Consumer disconnected after {} segments",
                self.metrics.emitted_unit_count
            ),
            Err(e) => {
                error!("Request failed: {}", e);
                // the consumer may already be gone
                let _ = self.tx.send(Err(e)).await;
            }
        }

        self.encoder.close();
        self.metrics.finish();
        self.orchestrator.metrics.report(&self.metrics);
        self.metrics
    }

    async fn drive(&mut self, units: Vec<TextUnit>) -> CadenceResult<Flow> {
        let mut processed = 0_usize;

        for unit in units {
            if self.tx.is_closed() {
                return Ok(Flow::Cancelled);
            }

            let rendered = match unit {
                TextUnit::Pause { seconds } => {
                    if seconds <= 0.0 {
                        continue;
                    }
                    processed += 1;
                    self.render_pause(seconds)?
                }
                TextUnit::Speech { text } => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    processed += 1;
                    let tx = self.tx.clone();
                    tokio::select! {
                        () = tx.closed() => return Ok(Flow::Cancelled),
                        rendered = self.render_speech(text) => rendered?,
                    }
                }
            };

            if let Some((kind, chunk)) = rendered {
                if !self.emit(kind, chunk).await {
                    return Ok(Flow::Cancelled);
                }
            }
        }

        if processed > 0 {
            let mut trailer = AudioChunk::new(Vec::<i16>::new(), self.encoder.sample_rate(), "");
            trailer.output = Some(self.encoder.finalize()?);
            if !self.emit(SegmentKind::Trailer, trailer).await {
                return Ok(Flow::Cancelled);
            }
        }
        Ok(Flow::Completed)
    }

    /// Send a segment; `false` when the consumer is gone
    async fn emit(&mut self, kind: SegmentKind, chunk: AudioChunk) -> bool {
        let len = chunk.output.as_ref().map_or(0, Vec::len);
        if len == 0 && !self.keep_empty {
            return true;
        }
        if len > 0 {
            self.metrics.record_segment(len);
        }

        let segment = AudioSegment {
            index: self.next_index,
            kind,
            chunk,
        };
        self.next_index += 1;
        self.tx.send(Ok(segment)).await.is_ok()
    }

    fn render_pause(&mut self, seconds: f64) -> CadenceResult<Rendered> {
        let seconds = if seconds > MAX_PAUSE_SECONDS {
            warn!("Clamping {}s pause to {}s", seconds, MAX_PAUSE_SECONDS);
            MAX_PAUSE_SECONDS
        } else {
            seconds
        };

        let rate = self.encoder.sample_rate();
        let count = (seconds * f64::from(rate)).round() as usize;
        let mut chunk = AudioChunk::new(vec![0_i16; count], rate, "");
        if let Err(e) = self.normalizer.normalize_chunk(&mut chunk) {
            warn!("Skipping pause: {}", e);
            self.metrics.record_skip();
            return Ok(None);
        }

        debug!("Pause of {:.3}s ({} samples)", seconds, count);
        chunk.output = Some(self.encoder.write_samples(&chunk.samples)?);
        Ok(Some((SegmentKind::Pause, chunk)))
    }

    async fn render_speech(&mut self, text: String) -> CadenceResult<Rendered> {
        let permit = self.orchestrator.gate.acquire().await?;

        let engine = Arc::clone(&self.orchestrator.engine);
        let style = self.job.voice.clone();
        let speed = self.job.speed;
        let unit_text = text.clone();
        let started = Instant::now();

        let result = self
            .orchestrator
            .pool
            .run(move || {
                // held until the blocking call returns, even if the request is cancelled
                let _permit = permit;
                engine.synthesize(&unit_text, &style, speed)
            })
            .await
            .and_then(|inner| inner);

        let waveform = match result {
            Ok(waveform) => waveform,
            Err(e) => {
                warn!("Skipping unit after synthesis failure: {}", e);
                self.metrics.record_skip();
                return Ok(None);
            }
        };
        debug!(
            "Synthesized {} chars into {} samples in {:?}",
            text.chars().count(),
            waveform.samples.len(),
            started.elapsed()
        );

        // every speech unit keeps its punctuation-sized tail, the last one included
        let mut chunk = AudioChunk::new(waveform.samples, waveform.sample_rate, text);
        if let Err(e) = self.normalizer.trim(&mut chunk, speed, false) {
            warn!("Skipping unit: {}", e);
            self.metrics.record_skip();
            return Ok(None);
        }

        chunk.output = Some(self.encoder.write_samples(&chunk.samples)?);
        Ok(Some((SegmentKind::Speech, chunk)))
    }
}
