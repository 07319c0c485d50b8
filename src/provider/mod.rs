//! Provider layer: the gateway contract, reference adapters and decorators.
//!
//! A [`Provider`] turns one send (or one batch) into an [`Outcome`]. Gateway-level rejections
//! are data inside the outcome; only failures that prevent any outcome from being known are
//! returned as [`TransportError`].

mod batch;
mod gateway;
pub(crate) mod http;
mod rate_limit;
mod registry;
mod retry;

use std::error::Error as StdError;
use std::sync::Arc;

use crate::BoxFuture;
use crate::domain::{BulkOutcome, ErrorDescriptor, Outcome};

pub use batch::{BatchGatewayProvider, BatchGatewayProviderBuilder};
pub use gateway::{BulkMode, HttpGatewayProvider, HttpGatewayProviderBuilder};
pub use rate_limit::RateLimitedProvider;
pub use registry::{ProviderFactory, ProviderRegistry};
pub use retry::RetryingProvider;

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, thiserror::Error)]
/// Failure that prevented a provider from determining any outcome.
pub enum TransportError {
    /// The request did not complete within the configured deadline.
    #[error("request timed out: {0}")]
    Timeout(#[source] BoxError),

    /// DNS, TLS or TCP connection failure.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// Any other HTTP client failure.
    #[error("transport error: {0}")]
    Other(#[source] BoxError),

    /// Rejected locally by [`RateLimitedProvider`] before reaching the gateway.
    #[error("rate limit exceeded: at most {max} messages per {window}")]
    RateLimited { max: u32, window: &'static str },

    /// A single call carries more recipients than a rate-limit window allows in total, so it
    /// can never be admitted. Split the recipients into smaller calls.
    #[error("{requested} recipients exceed the limit of {max} messages per {window}")]
    ExceedsLimit {
        requested: usize,
        max: u32,
        window: &'static str,
    },
}

impl TransportError {
    /// Numeric code stored in the `{error, code}` descriptor of failed records.
    pub fn code(&self) -> i64 {
        match self {
            Self::Timeout(_) => 28,
            Self::Connect(_) => 7,
            Self::Other(_) => 0,
            Self::RateLimited { .. } => 429,
            Self::ExceedsLimit { .. } => 413,
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::RateLimited { .. } | Self::ExceedsLimit { .. })
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor::new(self.to_string(), self.code())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Box::new(err))
        } else if err.is_connect() {
            Self::Connect(Box::new(err))
        } else {
            Self::Other(Box::new(err))
        }
    }
}

/// Contract implemented by every SMS gateway integration.
///
/// Implementations are stateless per call. `send_bulk` should submit the whole batch in one
/// gateway operation when the gateway supports it; gateways without a batch API may loop
/// internally and return [`BulkOutcome::PerRecipient`].
pub trait Provider: Send + Sync {
    /// Identifier persisted as the record's `provider`.
    fn name(&self) -> &str;

    fn send<'a>(
        &'a self,
        recipient: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<Outcome, TransportError>>;

    fn send_bulk<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
    ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>>;
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn send<'a>(
        &'a self,
        recipient: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<Outcome, TransportError>> {
        (**self).send(recipient, message)
    }

    fn send_bulk<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
    ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>> {
        (**self).send_bulk(recipients, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_and_retryability() {
        let timeout = TransportError::Timeout("deadline".into());
        assert_eq!(timeout.code(), 28);
        assert!(timeout.is_retryable());

        let connect = TransportError::Connect("refused".into());
        assert_eq!(connect.code(), 7);
        assert!(connect.is_retryable());

        let limited = TransportError::RateLimited {
            max: 60,
            window: "minute",
        };
        assert_eq!(limited.code(), 429);
        assert!(!limited.is_retryable());
        assert_eq!(
            limited.to_string(),
            "rate limit exceeded: at most 60 messages per minute"
        );

        let oversized = TransportError::ExceedsLimit {
            requested: 61,
            max: 60,
            window: "minute",
        };
        assert_eq!(oversized.code(), 413);
        assert!(!oversized.is_retryable());
        assert_eq!(
            oversized.to_string(),
            "61 recipients exceed the limit of 60 messages per minute"
        );
    }

    #[test]
    fn descriptor_uses_display_text() {
        let err = TransportError::Timeout("Connection timeout".into());
        let descriptor = err.descriptor();
        assert_eq!(descriptor.error, "request timed out: Connection timeout");
        assert_eq!(descriptor.code, 28);
    }
}
