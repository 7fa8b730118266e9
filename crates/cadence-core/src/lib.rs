//! # Cadence Core
//!
//! Streaming text-to-speech orchestration around an external neural synthesizer.
//!
//! ## Features
//!
//! - Deterministic text normalization (numbers, abbreviations, symbols)
//! - Paragraph and sentence aware segmentation with `[pause:N]` directives
//! - Bounded-concurrency synthesis dispatch shared across requests
//! - Silence-aware edge trimming of every synthesized chunk
//! - Incremental encoding into WAV, PCM, MP3, Ogg/Opus, FLAC and ADTS AAC
//! - Progressive streaming or buffered delivery with TTFB reporting
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cadence_core::{
//!     ApiKeyContext, Settings, SpeechRequest, SpeechService, SynthesisEngine,
//!     TracingMetricsSink, TracingUsageSink,
//! };
//! # use cadence_core::{Synthesizer, VoiceStyle, Waveform};
//! # struct MyModel;
//! # impl Synthesizer for MyModel {
//! #     fn synthesize(&self, _: &str, _: &VoiceStyle, _: f32) -> anyhow::Result<Waveform> {
//! #         Ok(Waveform { samples: vec![0.0; 2400], sample_rate: 24_000 })
//! #     }
//! #     fn sample_rate(&self) -> u32 { 24_000 }
//! #     fn voice_style_names(&self) -> Vec<String> { vec!["F1".into()] }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::default();
//!     let engine = Arc::new(SynthesisEngine::initialize(Arc::new(MyModel), &settings.engine)?);
//!     let service = SpeechService::new(
//!         engine,
//!         settings,
//!         Arc::new(TracingMetricsSink),
//!         Arc::new(TracingUsageSink),
//!     )?;
//!
//!     let mut request = SpeechRequest::new("Hello world. [pause:0.5] Goodbye.");
//!     request.response_format = "wav".to_string();
//!     let response = service.handle(request, &ApiKeyContext::anonymous()).await?;
//!     println!("{}", response.media_type());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod admission;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod service;
pub mod text;
pub mod usage;
pub mod voice;
pub mod worker_pool;

// Re-export main types for convenience
pub use admission::{AdmissionGate, GatePermit, GateStats};
pub use audio::{
    AudioChunk, AudioFormat, AudioNormalizer, AudioSamples, FormatWriter, StreamEncoder,
    WordTimestamp,
};
pub use config::{
    BillingConfig, EncoderConfig, EngineConfig, LoggingConfig, PipelineConfig, Settings,
    TrimConfig,
};
pub use engine::{BackendOptions, ExecutionProvider, SynthesisEngine, Synthesizer, Waveform};
pub use error::{CadenceError, CadenceResult};
pub use logging::init_logging;
pub use metrics::{InMemoryMetrics, MetricsSink, StreamMetrics, TracingMetricsSink};
pub use orchestrator::{
    AudioSegment, AudioStream, SegmentKind, SpeechJob, SynthesisOrchestrator, SynthesizedAudio,
};
pub use service::{ApiKeyContext, SpeechRequest, SpeechResponse, SpeechService};
pub use text::{smart_split, NormalizationOptions, TextNormalizer, TextSegmenter, TextUnit};
pub use usage::{InMemoryUsageLedger, TracingUsageSink, UsageRecord, UsageSink, UsageTotals};
pub use voice::{VoiceResolution, VoiceStyle, VoiceTable};
pub use worker_pool::WorkerPool;

/// Version information for the cadence-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sample rate for audio processing (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default number of audio channels (mono)
pub const DEFAULT_CHANNELS: u16 = 1;

/// Maximum request text length in characters
pub const MAX_TEXT_LENGTH: usize = 100_000;

/// Default upper bound for a packed speech unit, in characters
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 300;
