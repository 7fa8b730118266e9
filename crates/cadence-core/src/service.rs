//! Speech request facade.
//!
//! Validates a request, records usage, normalizes the text, resolves the
//! voice and hands the job to the orchestrator in streaming or buffered mode.

use crate::admission::AdmissionGate;
use crate::audio::AudioFormat;
use crate::config::Settings;
use crate::engine::SynthesisEngine;
use crate::error::{CadenceError, CadenceResult};
use crate::metrics::MetricsSink;
use crate::orchestrator::{AudioStream, SpeechJob, SynthesisOrchestrator, SynthesizedAudio};
use crate::text::{NormalizationOptions, TextNormalizer};
use crate::usage::{UsageRecord, UsageSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Slowest accepted speaking rate
pub const MIN_SPEED: f32 = 0.25;

/// Fastest accepted speaking rate
pub const MAX_SPEED: f32 = 4.0;

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

const fn default_speed() -> f32 {
    1.0
}

/// Body of a speech request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRequest {
    /// Model name, accepted for compatibility
    #[serde(default = "default_model")]
    pub model: String,
    /// Text to speak
    pub input: String,
    /// Voice or style name
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Output format name
    #[serde(default = "default_format")]
    pub response_format: String,
    /// Speaking rate
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Deliver progressively instead of buffered
    #[serde(default)]
    pub stream: bool,
    /// Text normalization switches
    #[serde(default)]
    pub normalization: NormalizationOptions,
}

impl SpeechRequest {
    /// Create a request with default settings
    pub fn new<S: Into<String>>(input: S) -> Self {
        Self {
            model: default_model(),
            input: input.into(),
            voice: default_voice(),
            response_format: default_format(),
            speed: default_speed(),
            stream: false,
            normalization: NormalizationOptions::default(),
        }
    }
}

/// Caller identity as established by the authentication layer
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKeyContext {
    /// Key name used for usage accounting
    pub name: String,
    /// Per-key price, overriding the configured default
    pub price_per_million_chars: Option<f64>,
}

impl ApiKeyContext {
    /// Create a context for a named key
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            price_per_million_chars: None,
        }
    }

    /// Set a per-key price
    #[must_use]
    pub fn with_price(mut self, price_per_million_chars: f64) -> Self {
        self.price_per_million_chars = Some(price_per_million_chars);
        self
    }

    /// Context for unauthenticated use
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

/// Result of a speech request
#[derive(Debug)]
pub enum SpeechResponse {
    /// Segments delivered as produced
    Stream(AudioStream),
    /// Whole file
    Complete(SynthesizedAudio),
}

impl SpeechResponse {
    /// Output format
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        match self {
            Self::Stream(stream) => stream.format(),
            Self::Complete(audio) => audio.format,
        }
    }

    /// Request id
    #[must_use]
    pub const fn request_id(&self) -> Uuid {
        match self {
            Self::Stream(stream) => stream.request_id(),
            Self::Complete(audio) => audio.request_id,
        }
    }

    /// Media type for the response body
    #[must_use]
    pub const fn media_type(&self) -> &'static str {
        self.format().mime_type()
    }

    /// Suggested download name
    #[must_use]
    pub fn filename(&self) -> String {
        format!("speech.{}", self.format().extension())
    }
}

/// Entry point for speech requests
#[derive(Clone)]
pub struct SpeechService {
    orchestrator: SynthesisOrchestrator,
    settings: Settings,
    usage: Arc<dyn UsageSink>,
}

impl std::fmt::Debug for SpeechService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechService")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl SpeechService {
    /// Build the service and its shared admission gate from settings
    ///
    /// # Errors
    ///
    /// Returns an error if the worker pool cannot start.
    pub fn new(
        engine: Arc<SynthesisEngine>,
        settings: Settings,
        metrics: Arc<dyn MetricsSink>,
        usage: Arc<dyn UsageSink>,
    ) -> CadenceResult<Self> {
        let gate = AdmissionGate::new(settings.pipeline.admission_capacity());
        info!(
            "Speech service: {} workers, {} admission slots",
            settings.pipeline.resolved_workers(),
            gate.capacity()
        );
        let orchestrator = SynthesisOrchestrator::new(engine, gate, settings.pipeline.clone(), metrics)?
            .with_trim_config(settings.trim.clone())
            .with_bit_rate(settings.encoder.bit_rate);

        Ok(Self::with_orchestrator(orchestrator, settings, usage))
    }

    /// Build the service around an existing orchestrator
    #[must_use]
    pub fn with_orchestrator(
        orchestrator: SynthesisOrchestrator,
        settings: Settings,
        usage: Arc<dyn UsageSink>,
    ) -> Self {
        Self {
            orchestrator,
            settings,
            usage,
        }
    }

    /// Orchestrator driving the requests
    #[must_use]
    pub const fn orchestrator(&self) -> &SynthesisOrchestrator {
        &self.orchestrator
    }

    /// Check a request without doing any work
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for bad text or speed and `UnsupportedFormat`
    /// for a format with no encoder in this build.
    pub fn validate(request: &SpeechRequest) -> CadenceResult<AudioFormat> {
        if request.input.trim().is_empty() {
            return Err(CadenceError::invalid_input("Input text cannot be empty"));
        }

        let chars = request.input.chars().count();
        if chars > crate::MAX_TEXT_LENGTH {
            return Err(CadenceError::invalid_input(format!(
                "Input too long: {chars} characters (max: {})",
                crate::MAX_TEXT_LENGTH
            )));
        }

        if !request.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&request.speed) {
            return Err(CadenceError::invalid_input(format!(
                "Speed must be between {MIN_SPEED} and {MAX_SPEED}, got {}",
                request.speed
            )));
        }

        let format: AudioFormat = request.response_format.parse()?;
        if !format.has_builtin_encoder() {
            return Err(CadenceError::unsupported_format(format.extension()));
        }
        Ok(format)
    }

    /// Run a request
    ///
    /// Usage is recorded once the request passes validation, whatever the
    /// synthesis outcome.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any work, and in buffered mode the
    /// first fatal pipeline error.
    pub async fn handle(
        &self,
        request: SpeechRequest,
        api_key: &ApiKeyContext,
    ) -> CadenceResult<SpeechResponse> {
        let format = Self::validate(&request)?;
        let request_id = Uuid::new_v4();
        debug!(
            "Request {} for model '{}' in {} (stream: {})",
            request_id, request.model, format, request.stream
        );

        self.record_usage(request_id, &request, api_key);

        let text = TextNormalizer::new(request.normalization).normalize(&request.input);
        debug!("Normalized text: {:.100}", text);

        let voice = if request.voice.trim().is_empty() {
            self.settings.pipeline.default_voice.as_str()
        } else {
            request.voice.as_str()
        };
        let (style, _) = self.orchestrator.engine().resolve_voice(voice);

        let job = SpeechJob::new(text, style, format)
            .with_speed(request.speed)
            .with_request_id(request_id);

        if request.stream {
            Ok(SpeechResponse::Stream(self.orchestrator.stream(job).await?))
        } else {
            Ok(SpeechResponse::Complete(self.orchestrator.synthesize(job).await?))
        }
    }

    fn record_usage(&self, request_id: Uuid, request: &SpeechRequest, api_key: &ApiKeyContext) {
        let price = api_key
            .price_per_million_chars
            .unwrap_or(self.settings.billing.price_per_million_chars);
        let record = UsageRecord::priced(
            request_id,
            &api_key.name,
            request.input.chars().count(),
            price,
        );

        if let Err(e) = self.usage.record(&record) {
            warn!("Failed to track usage for {}: {}", api_key.name, e);
        }
    }
}
