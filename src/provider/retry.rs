//! Retry decorator for transient transport failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::BoxFuture;
use crate::domain::{BulkOutcome, Outcome};
use crate::provider::{Provider, TransportError};

/// Repeats a provider call while it fails with a retryable [`TransportError`].
///
/// Outcomes, including failed ones, are returned as-is: a gateway that answered has decided,
/// and resending could deliver the message twice.
#[derive(Debug, Clone)]
pub struct RetryingProvider<P> {
    inner: P,
    attempts: u32,
    delay: Duration,
}

impl<P: Provider> RetryingProvider<P> {
    /// `attempts` is the total number of calls; values below 1 are treated as 1.
    pub fn new(inner: P, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn run<'a, T, F, Fut>(&'a self, op: &'static str, call: F) -> Result<T, TransportError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, TransportError>> + 'a,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    warn!(
                        provider = self.inner.name(),
                        op,
                        attempt,
                        error = %err,
                        "transient transport error, will retry"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl<P: Provider> Provider for RetryingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send<'a>(
        &'a self,
        recipient: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<Outcome, TransportError>> {
        Box::pin(self.run("send", move || self.inner.send(recipient, message)))
    }

    fn send_bulk<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
    ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>> {
        Box::pin(self.run("send_bulk", move || {
            self.inner.send_bulk(recipients, message)
        }))
    }
}
