//! Logging system for Secret Santa.
//!
//! Output goes to stderr so rendered documents on stdout stay clean.
//! `RUST_LOG`, when set, overrides the configured level.

use santa_types::{LogConfig, LogFormat, Result, SantaError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with default configuration.
pub fn init_default() -> Result<()> {
    init(&LogConfig::default())
}

/// Initialize logging from configuration.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config));

    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| SantaError::config("log", format!("failed to initialize logging: {}", e)))
}

/// Build the level filter, preferring `RUST_LOG` over the configured level.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use santa_types::LogLevel;

    #[test]
    fn test_filter_uses_configured_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: LogLevel::Debug,
            format: LogFormat::Compact,
        };
        assert_eq!(build_filter(&config).to_string(), "debug");
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let _ = init(&config);
        let err = init(&config).unwrap_err();
        assert!(matches!(err, SantaError::Config { ref field, .. } if field == "log"));
    }
}
