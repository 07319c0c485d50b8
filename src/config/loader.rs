//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, an optional TOML file, then
//! `SMS_*` environment variables.

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use super::ConfigError;
use super::model::SmsConfig;

/// Env prefix for overrides, e.g. `SMS_HTTP_API_KEY`.
pub const ENV_PREFIX: &str = "SMS_";

/// Sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &["rate_limit", "logging", "storage", "retry", "batch", "http"];

/// Load `./sms.toml` (if present) plus environment overrides.
pub fn load_config() -> Result<SmsConfig, ConfigError> {
    extract(build_figment(Some(Path::new("sms.toml"))))
}

/// Load a specific TOML file with environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<SmsConfig, ConfigError> {
    extract(build_figment(Some(path)))
}

/// Load from an inline TOML document only (no file lookup, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<SmsConfig, ConfigError> {
    extract(
        Figment::new()
            .merge(Serialized::defaults(SmsConfig::default()))
            .merge(Toml::string(toml_content)),
    )
}

/// Build the Figment used for loading, before extraction.
pub fn build_figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(SmsConfig::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

fn extract(figment: Figment) -> Result<SmsConfig, ConfigError> {
    let config: SmsConfig = figment
        .extract()
        .map_err(|err| ConfigError::Load(Box::new(err)))?;
    config.validate()?;
    Ok(config)
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
        .map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Map a lowercased, prefix-stripped env key to a dotted config path.
///
/// Figment passes keys in their original case, so the caller lowercases first.
///
/// Uses an explicit section list instead of splitting on `_`, because field names contain
/// underscores: `http_api_key` must become `http.api_key`, not `http.api.key`.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(field) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{field}");
        }
    }
    key.to_owned()
}
