//! Service configuration loaded from TOML with environment overrides.

use crate::engine::ExecutionProvider;
use crate::error::{CadenceError, CadenceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Log output configuration
    pub logging: LoggingConfig,
    /// Synthesis backend configuration
    pub engine: EngineConfig,
    /// Orchestration limits and defaults
    pub pipeline: PipelineConfig,
    /// Chunk edge trimming
    pub trim: TrimConfig,
    /// Encoder settings
    pub encoder: EncoderConfig,
    /// Usage pricing
    pub billing: BillingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `cadence_core=debug`
    pub level: String,
    /// Emit ANSI colours
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: false,
        }
    }
}

/// Synthesis backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Preferred hardware provider
    pub provider: ExecutionProvider,
    /// Intra-op threads for the backend, 0 lets the backend decide
    pub model_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ExecutionProvider::Auto,
            model_threads: 0,
        }
    }
}

/// Orchestration limits and request defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads running synthesis calls, 0 means one per logical CPU
    pub max_workers: usize,
    /// Admission gate size as a multiple of the worker count
    pub admission_multiplier: usize,
    /// Upper bound for packed speech units, in characters
    pub max_chunk_length: usize,
    /// Voice used when a request names none
    pub default_voice: String,
    /// Sample rate assumed before the backend reports one
    pub sample_rate: u32,
    /// Segments buffered between the producer and a streaming consumer
    pub channel_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            admission_multiplier: 2,
            max_chunk_length: crate::DEFAULT_MAX_CHUNK_LENGTH,
            default_voice: "alloy".to_string(),
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
            channel_buffer: 16,
        }
    }
}

impl PipelineConfig {
    /// Worker count after resolving the `0 = auto` convention
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        if self.max_workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.max_workers
        }
    }

    /// Number of admission gate slots shared by all requests
    #[must_use]
    pub fn admission_capacity(&self) -> usize {
        self.resolved_workers() * self.admission_multiplier.max(1)
    }
}

/// Chunk edge trimming parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Fixed margin removed from both ends of every synthesized chunk
    pub gap_trim_ms: f64,
    /// Silence kept after speech before applying the punctuation multiplier
    pub dynamic_gap_trim_padding_ms: f64,
    /// Trailing punctuation to end-padding multiplier
    pub padding_multipliers: BTreeMap<String, f64>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        let padding_multipliers = [(".", 1.0), ("!", 0.9), ("?", 1.0), (",", 0.8)]
            .into_iter()
            .map(|(c, m)| (c.to_string(), m))
            .collect();

        Self {
            gap_trim_ms: 1.0,
            dynamic_gap_trim_padding_ms: 410.0,
            padding_multipliers,
        }
    }
}

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Bit rate for lossy codecs in bits per second
    pub bit_rate: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { bit_rate: 128_000 }
    }
}

/// Usage pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Price charged per one million input characters
    pub price_per_million_chars: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            price_per_million_chars: 15.0,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails validation.
    pub fn load(path: &Path) -> CadenceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CadenceError::file(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml(&content)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from a TOML file, falling back to defaults when the file is missing
    ///
    /// # Errors
    ///
    /// Returns an error for unreadable files or invalid TOML.
    pub fn load_or_default(path: &Path) -> CadenceResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse settings from a TOML document
    ///
    /// # Errors
    ///
    /// Returns an error for invalid TOML or values that fail validation.
    pub fn from_toml(content: &str) -> CadenceResult<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Platform configuration path, e.g. `~/.config/cadence/config.toml` on Linux
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cadence")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - `CADENCE_LOG_LEVEL` → logging.level
    /// - `CADENCE_FORCE_PROVIDERS` → engine.provider
    /// - `CADENCE_MODEL_THREADS` → engine.model_threads
    /// - `CADENCE_MAX_WORKERS` → pipeline.max_workers
    /// - `CADENCE_MAX_CHUNK_LENGTH` → pipeline.max_chunk_length
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable cannot be parsed.
    pub fn with_env_overrides(mut self) -> CadenceResult<Self> {
        if let Some(level) = env_value("CADENCE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(provider) = env_value("CADENCE_FORCE_PROVIDERS") {
            self.engine.provider = provider.parse()?;
        }
        if let Some(threads) = env_value("CADENCE_MODEL_THREADS") {
            self.engine.model_threads = parse_env("CADENCE_MODEL_THREADS", &threads)?;
        }
        if let Some(workers) = env_value("CADENCE_MAX_WORKERS") {
            self.pipeline.max_workers = parse_env("CADENCE_MAX_WORKERS", &workers)?;
        }
        if let Some(length) = env_value("CADENCE_MAX_CHUNK_LENGTH") {
            self.pipeline.max_chunk_length = parse_env("CADENCE_MAX_CHUNK_LENGTH", &length)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.pipeline.max_chunk_length == 0 {
            return Err(CadenceError::configuration(
                "pipeline.max_chunk_length must be greater than 0",
            ));
        }

        if self.pipeline.channel_buffer == 0 {
            return Err(CadenceError::configuration(
                "pipeline.channel_buffer must be greater than 0",
            ));
        }

        if self.pipeline.sample_rate < 8000 || self.pipeline.sample_rate > 192_000 {
            return Err(CadenceError::configuration(format!(
                "pipeline.sample_rate must be between 8000 and 192000 Hz, got {}",
                self.pipeline.sample_rate
            )));
        }

        if self.trim.gap_trim_ms < 0.0 || self.trim.dynamic_gap_trim_padding_ms < 0.0 {
            return Err(CadenceError::configuration(
                "trim durations cannot be negative",
            ));
        }

        for (key, multiplier) in &self.trim.padding_multipliers {
            if key.chars().count() != 1 {
                return Err(CadenceError::configuration(format!(
                    "trim.padding_multipliers keys must be single characters, got '{key}'"
                )));
            }
            if *multiplier < 0.0 {
                return Err(CadenceError::configuration(format!(
                    "trim.padding_multipliers['{key}'] cannot be negative"
                )));
            }
        }

        if self.billing.price_per_million_chars < 0.0 {
            return Err(CadenceError::configuration(
                "billing.price_per_million_chars cannot be negative",
            ));
        }

        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> CadenceResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CadenceError::configuration(format!("{key} has invalid value '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clear_env() {
        for key in [
            "CADENCE_LOG_LEVEL",
            "CADENCE_FORCE_PROVIDERS",
            "CADENCE_MODEL_THREADS",
            "CADENCE_MAX_WORKERS",
            "CADENCE_MAX_CHUNK_LENGTH",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.engine.provider, ExecutionProvider::Auto);
        assert_eq!(settings.pipeline.max_workers, 8);
        assert_eq!(settings.pipeline.max_chunk_length, 300);
        assert_eq!(settings.pipeline.default_voice, "alloy");
        assert_eq!(settings.trim.gap_trim_ms, 1.0);
        assert_eq!(settings.trim.dynamic_gap_trim_padding_ms, 410.0);
        assert_eq!(settings.trim.padding_multipliers.get("!"), Some(&0.9));
        assert_eq!(settings.encoder.bit_rate, 128_000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_admission_capacity() {
        let mut pipeline = PipelineConfig::default();
        assert_eq!(pipeline.admission_capacity(), 16);

        pipeline.admission_multiplier = 0;
        assert_eq!(pipeline.admission_capacity(), 8);

        pipeline.max_workers = 0;
        assert!(pipeline.resolved_workers() >= 1);
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml(
            r#"
            [pipeline]
            max_workers = 2
            max_chunk_length = 120

            [engine]
            provider = "cuda"

            [trim.padding_multipliers]
            ";" = 0.5
            "#,
        )
        .expect("valid toml");

        assert_eq!(settings.pipeline.max_workers, 2);
        assert_eq!(settings.pipeline.max_chunk_length, 120);
        assert_eq!(settings.pipeline.default_voice, "alloy");
        assert_eq!(settings.engine.provider, ExecutionProvider::Cuda);
        assert_eq!(settings.trim.padding_multipliers.get(";"), Some(&0.5));
        assert_eq!(settings.trim.dynamic_gap_trim_padding_ms, 410.0);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        assert!(Settings::from_toml("[pipeline]\nmax_chunk_length = 0").is_err());
        assert!(Settings::from_toml("[trim]\ngap_trim_ms = -1.0").is_err());
        assert!(Settings::from_toml("[trim.padding_multipliers]\n\"ab\" = 1.0").is_err());
        assert!(Settings::from_toml("[pipeline\n").is_err());
    }

    #[test]
    fn test_load_and_load_or_default() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "[logging]\nlevel = \"debug\"").expect("write");

        let settings = Settings::load(file.path()).expect("load");
        assert_eq!(settings.logging.level, "debug");

        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.toml");
        assert_eq!(Settings::load_or_default(&missing).unwrap(), Settings::default());
        assert!(matches!(
            Settings::load(&missing),
            Err(CadenceError::FileError { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("CADENCE_MAX_WORKERS", "3");
        std::env::set_var("CADENCE_FORCE_PROVIDERS", "cpu");
        std::env::set_var("CADENCE_LOG_LEVEL", "trace");

        let settings = Settings::default().with_env_overrides().expect("overrides");
        assert_eq!(settings.pipeline.max_workers, 3);
        assert_eq!(settings.engine.provider, ExecutionProvider::Cpu);
        assert_eq!(settings.logging.level, "trace");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_number() {
        clear_env();
        std::env::set_var("CADENCE_MAX_CHUNK_LENGTH", "lots");
        let result = Settings::default().with_env_overrides();
        assert!(matches!(result, Err(CadenceError::ConfigurationError { .. })));
        clear_env();
    }
}
