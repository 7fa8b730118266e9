//! Tracing subscriber setup.

use crate::config::LoggingConfig;
use crate::error::{CadenceError, CadenceResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Build the filter used by [`init_logging`]
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
///
/// # Errors
///
/// Returns a configuration error if neither source yields a valid directive.
pub fn build_filter(config: &LoggingConfig) -> CadenceResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level).map_err(|e| {
        CadenceError::configuration(format!("Invalid log level '{}': {e}", config.level))
    })
}

/// Install the global tracing subscriber
///
/// Logs go to stderr. Calling this when a global subscriber is already set
/// leaves the existing one in place and succeeds.
///
/// # Errors
///
/// Returns a configuration error for an unparsable level.
pub fn init_logging(config: &LoggingConfig) -> CadenceResult<()> {
    let filter = build_filter(config)?;

    let subscriber = tracing_subscriber::Registry::default().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(config.ansi)
            .with_target(true),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_invalid_level_rejected() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig {
            level: "cadence_core=loud".to_string(),
            ansi: false,
        };
        let result = init_logging(&config);
        assert!(matches!(result, Err(CadenceError::ConfigurationError { .. })));
    }

    #[test]
    #[serial]
    fn test_init_twice_is_ok() {
        std::env::remove_var("RUST_LOG");
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
