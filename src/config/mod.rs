//! Configuration: model, layered loading and validation.

mod loader;
mod model;

pub use loader::{ENV_PREFIX, build_figment, load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BatchGatewayConfig, HttpGatewayConfig, LoggingConfig, RateLimitConfig, RetryConfig,
    SmsConfig, StorageConfig,
};

use crate::provider::TransportError;

#[derive(Debug, thiserror::Error)]
/// Errors raised while loading configuration or binding a provider from it.
pub enum ConfigError {
    /// The figment layers could not be merged or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    /// No factory is registered under the configured provider name.
    #[error("unknown provider `{name}` (registered: {known})")]
    UnknownProvider { name: String, known: String },

    /// A value is present but unusable.
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The adapter's HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] TransportError),
}

impl SmsConfig {
    /// Reject values that deserialize fine but cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "provider",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.attempts",
                reason: "must be at least 1 (1 disables retries)".to_owned(),
            });
        }
        if self.rate_limit.enabled
            && self.rate_limit.max_per_minute == 0
            && self.rate_limit.max_per_hour == 0
        {
            return Err(ConfigError::Invalid {
                field: "rate_limit",
                reason: "enabled without any window; set a limit or disable it".to_owned(),
            });
        }
        Ok(())
    }
}
