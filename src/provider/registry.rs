//! Name-to-factory mapping used to bind a provider from configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigError, SmsConfig};
use crate::provider::{
    BatchGatewayProvider, HttpGatewayProvider, Provider, RateLimitedProvider, RetryingProvider,
};

/// Builds a provider from the loaded configuration.
pub type ProviderFactory =
    Box<dyn Fn(&SmsConfig) -> Result<Arc<dyn Provider>, ConfigError> + Send + Sync>;

/// Registry of provider factories, indexed by name.
///
/// [`ProviderRegistry::new`] knows the built-in `http` and `batch` adapters; custom gateways
/// are added with [`ProviderRegistry::register`] and selected by `provider = "<name>"`.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Creates a registry without any factories.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in adapters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(HttpGatewayProvider::NAME, |config| {
            Ok(Arc::new(HttpGatewayProvider::from_config(config)?) as Arc<dyn Provider>)
        });
        registry.register(BatchGatewayProvider::NAME, |config| {
            Ok(Arc::new(BatchGatewayProvider::from_config(config)?) as Arc<dyn Provider>)
        });
        registry
    }

    /// Registers a factory, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SmsConfig) -> Result<Arc<dyn Provider>, ConfigError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the named provider without decorators.
    pub fn build(&self, name: &str, config: &SmsConfig) -> Result<Arc<dyn Provider>, ConfigError> {
        let factory = self
            .factories
            .get(name.trim())
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: name.to_owned(),
                known: self.names().join(", "),
            })?;
        factory(config)
    }

    /// Builds `config.provider` and wraps it in the retry and rate-limit decorators the
    /// configuration enables. Rate limiting sits outermost so retries never consume budget.
    pub fn resolve(&self, config: &SmsConfig) -> Result<Arc<dyn Provider>, ConfigError> {
        let mut provider = self.build(&config.provider, config)?;

        if config.retry.attempts > 1 {
            debug!(
                provider = provider.name(),
                attempts = config.retry.attempts,
                delay_ms = config.retry.delay_ms,
                "enabling retries"
            );
            provider = Arc::new(RetryingProvider::new(
                provider,
                config.retry.attempts,
                config.retry.delay(),
            ));
        }

        if config.rate_limit.enabled {
            debug!(
                provider = provider.name(),
                max_per_minute = config.rate_limit.max_per_minute,
                max_per_hour = config.rate_limit.max_per_hour,
                "enabling rate limit"
            );
            provider = Arc::new(RateLimitedProvider::new(
                provider,
                config.rate_limit.max_per_minute,
                config.rate_limit.max_per_hour,
            ));
        }

        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("factories", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::BoxFuture;
    use crate::config::load_config_from_str;
    use crate::domain::{BulkOutcome, Outcome};
    use crate::provider::TransportError;

    struct Echo;

    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn send<'a>(
            &'a self,
            recipient: &'a str,
            _message: &'a str,
        ) -> BoxFuture<'a, Result<Outcome, TransportError>> {
            Box::pin(async move { Ok(Outcome::sent(Some(recipient.to_owned()), json!({}))) })
        }

        fn send_bulk<'a>(
            &'a self,
            _recipients: &'a [String],
            _message: &'a str,
        ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>> {
            Box::pin(async { Ok(BulkOutcome::PerRecipient(Vec::new())) })
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.names(), vec!["batch", "http"]);
    }

    #[test]
    fn builds_builtin_adapters_by_name() {
        let registry = ProviderRegistry::new();
        let config = SmsConfig::default();

        assert_eq!(registry.build("http", &config).unwrap().name(), "http");
        assert_eq!(registry.build("batch", &config).unwrap().name(), "batch");
    }

    #[test]
    fn unknown_name_lists_known_providers() {
        let registry = ProviderRegistry::new();
        let err = registry
            .build("carrier-pigeon", &SmsConfig::default())
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "unknown provider `carrier-pigeon` (registered: batch, http)"
        );
    }

    #[tokio::test]
    async fn resolve_binds_custom_provider_behind_decorators() {
        let mut registry = ProviderRegistry::empty();
        registry.register("echo", |_config| Ok(Arc::new(Echo) as Arc<dyn Provider>));
        let config = load_config_from_str("provider = \"echo\"\n").unwrap();

        let provider = registry.resolve(&config).unwrap();
        assert_eq!(provider.name(), "echo");

        let outcome = provider.send("+9779801002468", "hi").await.unwrap();
        assert_eq!(outcome.external_id.as_deref(), Some("+9779801002468"));
    }

    #[tokio::test]
    async fn resolve_applies_configured_rate_limit() {
        let mut registry = ProviderRegistry::empty();
        registry.register("echo", |_config| Ok(Arc::new(Echo) as Arc<dyn Provider>));
        let config = load_config_from_str(
            "provider = \"echo\"\n[rate_limit]\nmax_per_minute = 1\nmax_per_hour = 0\n",
        )
        .unwrap();

        let provider = registry.resolve(&config).unwrap();
        provider.send("+9779801002468", "hi").await.unwrap();
        let err = provider.send("+9779801002468", "hi").await.unwrap_err();
        assert!(matches!(err, TransportError::RateLimited { max: 1, .. }));
    }

    #[test]
    fn factory_errors_propagate() {
        let registry = ProviderRegistry::new();
        let config = load_config_from_str("[http]\nbase_url = \"not a url\"\n").unwrap();

        let err = registry.build("http", &config).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid { field: "http.base_url", .. }));
    }
}
