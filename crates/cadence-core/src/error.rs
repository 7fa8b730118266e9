//! Error types for the Cadence speech pipeline.

/// Result type alias for Cadence operations
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Main error type for Cadence pipeline operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CadenceError {
    /// The external synthesis call failed
    #[error("TTS synthesis failed: {message}")]
    SynthesisError {
        /// Error message describing the failure
        message: String,
    },

    /// Audio conditioning or encoding error
    #[error("Audio processing error: {message}")]
    AudioProcessingError {
        /// Error message describing the processing issue
        message: String,
    },

    /// Encoder used outside its state machine (write after finalize, double finalize)
    #[error("Encoder state error: {message}")]
    EncoderStateError {
        /// Error message describing the contract violation
        message: String,
    },

    /// Requested output format has no available encoder
    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat {
        /// The format that was requested
        format: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    FileError {
        /// Error message describing the file operation failure
        message: String,
    },

    /// Worker pool or admission gate failure
    #[error("Concurrency error: {message}")]
    ConcurrencyError {
        /// Error message describing the concurrency issue
        message: String,
    },
}

impl CadenceError {
    /// Create a new synthesis error
    #[must_use]
    pub fn synthesis<S: Into<String>>(message: S) -> Self {
        Self::SynthesisError {
            message: message.into(),
        }
    }

    /// Create a new audio processing error
    #[must_use]
    pub fn audio_processing<S: Into<String>>(message: S) -> Self {
        Self::AudioProcessingError {
            message: message.into(),
        }
    }

    /// Create a new encoder state error
    #[must_use]
    pub fn encoder_state<S: Into<String>>(message: S) -> Self {
        Self::EncoderStateError {
            message: message.into(),
        }
    }

    /// Create a new unsupported format error
    #[must_use]
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::FileError {
            message: message.into(),
        }
    }

    /// Create a new concurrency error
    #[must_use]
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        Self::ConcurrencyError {
            message: message.into(),
        }
    }

    /// Check if this error is retriable
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::SynthesisError { .. } | Self::ConcurrencyError { .. }
        )
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::UnsupportedFormat { .. }
                | Self::ConfigurationError { .. }
        )
    }

    /// Get the error category for logging/metrics
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::SynthesisError { .. } => "synthesis",
            Self::AudioProcessingError { .. } => "audio_processing",
            Self::EncoderStateError { .. } => "encoder_state",
            Self::UnsupportedFormat { .. } => "format",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::FileError { .. } => "file",
            Self::ConcurrencyError { .. } => "concurrency",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for CadenceError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<toml::de::Error> for CadenceError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML: {err}"))
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for CadenceError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::concurrency(format!("Worker dropped its result: {err}"))
    }
}

impl From<tokio::task::JoinError> for CadenceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::concurrency(format!("Pipeline task failed: {err}"))
    }
}

impl From<tokio::sync::AcquireError> for CadenceError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::concurrency(format!("Admission gate closed: {err}"))
    }
}

impl From<anyhow::Error> for CadenceError {
    fn from(err: anyhow::Error) -> Self {
        Self::synthesis(format!("{err:#}"))
    }
}
