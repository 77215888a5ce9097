//! Configuration loading for the AgriSense client.
//!
//! All fields are required. No defaults.

use agrisense_cache::RetryPolicy;
use agrisense_core::Role;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "AGRISENSE_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub role: Role,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_ms: u64,
    pub max_ms: u64,
    pub multiplier: f64,
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    pub dismiss_after_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info,agrisense_cache=debug"`.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or AGRISENSE_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from an explicit path, falling back to `AGRISENSE_CONFIG`.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be >= 1".to_string(),
            });
        }
        if self.retry.max_attempts > 10 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be <= 10".to_string(),
            });
        }
        if self.retry.initial_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.initial_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.retry.max_ms < self.retry.initial_ms {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_ms",
                reason: "must be >= initial_ms".to_string(),
            });
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.multiplier",
                reason: "must be >= 1.0".to_string(),
            });
        }
        if self.notifications.dismiss_after_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.dismiss_after_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.notifications.dismiss_after_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.initial_ms),
                Duration::from_millis(self.max_ms),
            )
            .with_multiplier(self.multiplier)
            .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
api_base_url = "http://localhost:5000"
role = "farmer"
request_timeout_ms = 10000

[retry]
max_attempts = 3
initial_ms = 250
max_ms = 5000
multiplier = 2.0
jitter_ms = 100

[notifications]
dismiss_after_ms = 5000

[logging]
filter = "info"
format = "plain"
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = ClientConfig::from_toml_str(VALID).unwrap();
        config.validate().unwrap();
        assert_eq!(config.role, Role::Farmer);
        assert_eq!(config.logging.format, LogFormat::Plain);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.dismiss_after(), Duration::from_secs(5));

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let contents = format!("theme = \"dark\"\n{}", VALID);
        assert!(matches!(
            ClientConfig::from_toml_str(&contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_section_rejected() {
        let contents = VALID.replace("[notifications]\ndismiss_after_ms = 5000\n", "");
        assert!(matches!(
            ClientConfig::from_toml_str(&contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ClientConfig::from_toml_str(VALID).unwrap();
        config.api_base_url = "localhost:5000".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "api_base_url", .. })
        ));

        let mut config = ClientConfig::from_toml_str(VALID).unwrap();
        config.retry.max_ms = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "retry.max_ms", .. })
        ));

        let mut config = ClientConfig::from_toml_str(VALID).unwrap();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::from_toml_str(VALID).unwrap();
        config.retry.multiplier = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.replace("farmer", "buyer").as_bytes()).unwrap();
        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.role, Role::Buyer);
    }
}
