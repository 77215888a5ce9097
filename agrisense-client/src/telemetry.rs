//! Tracing subscriber setup.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ClientError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter: `RUST_LOG` wins over the configured directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ClientError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ClientError::Telemetry(format!("Invalid log filter: {}", e)))
}

/// Install the global subscriber. Logs go to stderr; stdout is for command
/// output.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ClientError> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Plain => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| ClientError::Telemetry(format!("Failed to init subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            filter: "agrisense=loudest".to_string(),
            format: LogFormat::Plain,
        };
        assert!(matches!(env_filter(&config), Err(ClientError::Telemetry(_))));
    }

    #[test]
    fn test_valid_filter_accepted() {
        let config = LoggingConfig {
            filter: "info,agrisense_cache=debug".to_string(),
            format: LogFormat::Json,
        };
        assert!(env_filter(&config).is_ok());
    }
}
