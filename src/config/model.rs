//! Configuration model for the dispatch engine.
//!
//! Every section rejects unknown keys and falls back to the defaults below when omitted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::BulkMode;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Registry key of the provider bound at startup (`http`, `batch`, or a custom one).
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Sender recorded when a send does not specify one.
    #[serde(default = "default_sender")]
    pub default_sender: String,

    /// Per-request deadline applied by the adapters' HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub http: HttpGatewayConfig,

    #[serde(default)]
    pub batch: BatchGatewayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl SmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            default_sender: default_sender(),
            timeout_secs: default_timeout_secs(),
            http: HttpGatewayConfig::default(),
            batch: BatchGatewayConfig::default(),
            logging: LoggingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_sender() -> String {
    "SMS Gateway".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Generic JSON gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HttpGatewayConfig {
    /// Base URL; `/send` and `/send-bulk` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent in the `Authorization` header.
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub bulk_mode: BulkMode,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            bulk_mode: BulkMode::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.example.com".to_string()
}

/// Batch-capable gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchGatewayConfig {
    #[serde(default = "default_single_url")]
    pub single_url: String,

    #[serde(default = "default_bulk_url")]
    pub bulk_url: String,

    /// Value of the `OrganisationCode` header.
    #[serde(default)]
    pub organisation_code: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for BatchGatewayConfig {
    fn default() -> Self {
        Self {
            single_url: default_single_url(),
            bulk_url: default_bulk_url(),
            organisation_code: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

fn default_single_url() -> String {
    crate::provider::BatchGatewayProvider::DEFAULT_SINGLE_ENDPOINT.to_string()
}

fn default_bulk_url() -> String {
    crate::provider::BatchGatewayProvider::DEFAULT_BULK_ENDPOINT.to_string()
}

/// Attempt logging from the dispatch service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Emit one `tracing` event per attempt with recipient, message and response.
    #[serde(default)]
    pub enabled: bool,
}

/// Sliding-window limits enforced by the rate-limit decorator.
///
/// Each recipient counts as one message. A bulk send larger than an enabled window is rejected
/// outright, so bulk batches must stay at or below `max_per_minute`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `0` disables the per-minute window.
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: u32,

    /// `0` disables the per-hour window.
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_per_minute() -> u32 {
    60
}

fn default_max_per_hour() -> u32 {
    1000
}

/// Retry decorator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per provider call; `1` disables retries.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

/// Delivery record storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "sent_messages.db".to_string()
}
