//! Synthesis engine handle.
//!
//! The acoustic model lives behind the [`Synthesizer`] trait. A
//! [`SynthesisEngine`] is built once at startup, picks the hardware
//! providers for the backend and is shared read-only by every request.

use crate::config::EngineConfig;
use crate::error::{CadenceError, CadenceResult};
use crate::voice::{VoiceResolution, VoiceStyle, VoiceTable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Audio returned by one synthesis call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    /// Float samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    /// Create a waveform
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// Hardware execution provider for the acoustic model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Best available, falling back to CPU
    Auto,
    /// NVIDIA CUDA
    Cuda,
    /// Apple Core ML
    CoreMl,
    /// Plain CPU
    Cpu,
    /// Apple GPU, served through Core ML
    Metal,
}

impl ExecutionProvider {
    /// Configuration name of the provider
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cuda => "cuda",
            Self::CoreMl => "coreml",
            Self::Cpu => "cpu",
            Self::Metal => "metal",
        }
    }

    /// Resolve a requested provider against what the backend offers
    ///
    /// The result is never empty; CPU is the last resort.
    #[must_use]
    pub fn resolve(self, available: &[Self]) -> Vec<Self> {
        let has = |p: Self| available.contains(&p);

        let selected = match self {
            Self::Cuda if has(Self::Cuda) => vec![Self::Cuda],
            Self::CoreMl if has(Self::CoreMl) => vec![Self::CoreMl],
            Self::Metal if has(Self::CoreMl) => vec![Self::CoreMl],
            Self::Metal => {
                warn!("Metal/CoreML requested but not available, falling back to CPU");
                vec![Self::Cpu]
            }
            Self::Cpu => vec![Self::Cpu],
            Self::Auto => [Self::Cuda, Self::CoreMl]
                .into_iter()
                .filter(|p| has(*p))
                .chain(std::iter::once(Self::Cpu))
                .collect(),
            Self::Cuda | Self::CoreMl => Vec::new(),
        };

        if selected.is_empty() {
            warn!("Provider {} not available, using CPU", self);
            vec![Self::Cpu]
        } else {
            selected
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = CadenceError;

    fn from_str(s: &str) -> CadenceResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            "cpu" => Ok(Self::Cpu),
            "metal" => Ok(Self::Metal),
            other => Err(CadenceError::configuration(format!(
                "Unknown execution provider '{other}', expected auto, cuda, coreml, cpu or metal"
            ))),
        }
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Options handed to the backend when it loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    /// Providers in priority order
    pub providers: Vec<ExecutionProvider>,
    /// Intra-op threads, 0 lets the backend decide
    pub threads: usize,
}

/// External acoustic model
///
/// Calls block and may run on any worker thread.
pub trait Synthesizer: Send + Sync {
    /// Generate audio for one unit of text
    ///
    /// # Errors
    ///
    /// Implementation-defined; the caller skips the unit.
    fn synthesize(&self, text: &str, style: &VoiceStyle, speed: f32) -> anyhow::Result<Waveform>;

    /// Native sample rate
    fn sample_rate(&self) -> u32;

    /// Style names the model ships with, in preference order
    fn voice_style_names(&self) -> Vec<String>;

    /// Providers this build of the backend can use
    fn available_providers(&self) -> Vec<ExecutionProvider> {
        vec![ExecutionProvider::Cpu]
    }

    /// Load model weights with the selected providers, called once
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded.
    fn load(&self, options: &BackendOptions) -> anyhow::Result<()> {
        let _ = options;
        Ok(())
    }
}

/// Shared, immutable handle over the loaded model
pub struct SynthesisEngine {
    synthesizer: Arc<dyn Synthesizer>,
    options: BackendOptions,
    sample_rate: u32,
    voices: VoiceTable,
}

impl std::fmt::Debug for SynthesisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisEngine")
            .field("options", &self.options)
            .field("sample_rate", &self.sample_rate)
            .field("voices", &self.voices)
            .finish_non_exhaustive()
    }
}

impl SynthesisEngine {
    /// Select providers, load the backend and capture its metadata
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the backend fails to load or
    /// reports a zero sample rate.
    pub fn initialize(synthesizer: Arc<dyn Synthesizer>, config: &EngineConfig) -> CadenceResult<Self> {
        info!("Initializing synthesis engine (provider strategy: {})", config.provider);

        let available = synthesizer.available_providers();
        let options = BackendOptions {
            providers: config.provider.resolve(&available),
            threads: config.model_threads,
        };
        debug!("Selected providers {:?} from {:?}", options.providers, available);

        synthesizer
            .load(&options)
            .map_err(|e| CadenceError::configuration(format!("Failed to load synthesis backend: {e:#}")))?;

        let sample_rate = synthesizer.sample_rate();
        if sample_rate == 0 {
            return Err(CadenceError::configuration(
                "Synthesis backend reported a zero sample rate",
            ));
        }

        let voices = VoiceTable::new(synthesizer.voice_style_names());
        info!(
            "Synthesis engine ready: {} Hz, {} voice styles",
            sample_rate,
            voices.styles().len()
        );

        Ok(Self {
            synthesizer,
            options,
            sample_rate,
            voices,
        })
    }

    /// Run one blocking synthesis call
    ///
    /// # Errors
    ///
    /// Returns a synthesis error carrying the backend's message.
    pub fn synthesize(&self, text: &str, style: &VoiceStyle, speed: f32) -> CadenceResult<Waveform> {
        self.synthesizer
            .synthesize(text, style, speed)
            .map_err(|e| CadenceError::synthesis(format!("{e:#}")))
    }

    /// Native sample rate of the model
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Styles the model offers
    #[must_use]
    pub const fn voices(&self) -> &VoiceTable {
        &self.voices
    }

    /// Providers the backend was loaded with
    #[must_use]
    pub fn providers(&self) -> &[ExecutionProvider] {
        &self.options.providers
    }

    /// Resolve a request's voice name
    #[must_use]
    pub fn resolve_voice(&self, voice: &str) -> (VoiceStyle, VoiceResolution) {
        self.voices.resolve(voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rstest::rstest;
    use ExecutionProvider::{Auto, CoreMl, Cpu, Cuda, Metal};

    #[rstest]
    #[case(Cuda, vec![Cuda, Cpu], vec![Cuda])]
    #[case(Cuda, vec![Cpu], vec![Cpu])]
    #[case(CoreMl, vec![CoreMl, Cpu], vec![CoreMl])]
    #[case(CoreMl, vec![], vec![Cpu])]
    #[case(Metal, vec![CoreMl], vec![CoreMl])]
    #[case(Metal, vec![Cuda], vec![Cpu])]
    #[case(Cpu, vec![Cuda, CoreMl], vec![Cpu])]
    #[case(Auto, vec![Cpu, CoreMl, Cuda], vec![Cuda, CoreMl, Cpu])]
    #[case(Auto, vec![], vec![Cpu])]
    fn test_provider_resolution(
        #[case] requested: ExecutionProvider,
        #[case] available: Vec<ExecutionProvider>,
        #[case] expected: Vec<ExecutionProvider>,
    ) {
        assert_eq!(requested.resolve(&available), expected);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("CoreML".parse::<ExecutionProvider>().unwrap(), CoreMl);
        assert_eq!(" cuda ".parse::<ExecutionProvider>().unwrap(), Cuda);
        let err = "tpu".parse::<ExecutionProvider>().unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert_eq!(Metal.to_string(), "metal");
    }

    #[test]
    fn test_provider_serde_names() {
        let json = serde_json::to_string(&CoreMl).unwrap();
        assert_eq!(json, "\"coreml\"");
        let parsed: ExecutionProvider = serde_json::from_str("\"cuda\"").unwrap();
        assert_eq!(parsed, Cuda);
    }

    struct Recording {
        loaded: Mutex<Option<BackendOptions>>,
        rate: u32,
    }

    impl Synthesizer for Recording {
        fn synthesize(&self, text: &str, _style: &VoiceStyle, _speed: f32) -> anyhow::Result<Waveform> {
            if text.is_empty() {
                anyhow::bail!("empty text");
            }
            Ok(Waveform::new(vec![0.0; 10], self.rate))
        }

        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn voice_style_names(&self) -> Vec<String> {
            vec!["F1".into(), "M1".into()]
        }

        fn available_providers(&self) -> Vec<ExecutionProvider> {
            vec![Cuda, Cpu]
        }

        fn load(&self, options: &BackendOptions) -> anyhow::Result<()> {
            *self.loaded.lock() = Some(options.clone());
            Ok(())
        }
    }

    #[test]
    fn test_initialize_loads_with_providers() {
        let backend = Arc::new(Recording {
            loaded: Mutex::new(None),
            rate: 24_000,
        });
        let config = EngineConfig {
            provider: Auto,
            model_threads: 4,
        };

        let engine = SynthesisEngine::initialize(backend.clone(), &config).unwrap();
        assert_eq!(engine.providers(), &[Cuda, Cpu]);
        assert_eq!(engine.sample_rate(), 24_000);
        assert_eq!(
            backend.loaded.lock().clone(),
            Some(BackendOptions {
                providers: vec![Cuda, Cpu],
                threads: 4,
            })
        );

        let (style, how) = engine.resolve_voice("echo");
        assert_eq!(style.name(), "M1");
        assert_eq!(how, VoiceResolution::Mapped);
    }

    #[test]
    fn test_synthesis_error_converted() {
        let engine = SynthesisEngine::initialize(
            Arc::new(Recording {
                loaded: Mutex::new(None),
                rate: 24_000,
            }),
            &EngineConfig::default(),
        )
        .unwrap();

        let err = engine.synthesize("", &VoiceStyle::new("F1"), 1.0).unwrap_err();
        assert_eq!(err, CadenceError::synthesis("empty text"));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let result = SynthesisEngine::initialize(
            Arc::new(Recording {
                loaded: Mutex::new(None),
                rate: 0,
            }),
            &EngineConfig::default(),
        );
        assert!(result.is_err());
    }
}
