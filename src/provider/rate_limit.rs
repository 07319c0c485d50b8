//! Sliding-window rate limiting in front of a provider.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::BoxFuture;
use crate::domain::{BulkOutcome, Outcome};
use crate::provider::{Provider, TransportError};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Rejects calls that would exceed the per-minute or per-hour message budget.
///
/// Every recipient counts as one message, so a bulk call of 10 consumes 10 slots. A rejected
/// call consumes nothing and fails with [`TransportError::RateLimited`] before the gateway is
/// contacted. A limit of `0` disables that window. A bulk call with more recipients than a
/// window's limit can never fit and fails with [`TransportError::ExceedsLimit`].
#[derive(Debug)]
pub struct RateLimitedProvider<P> {
    inner: P,
    max_per_minute: u32,
    max_per_hour: u32,
    sent: Mutex<VecDeque<Instant>>,
}

impl<P: Provider> RateLimitedProvider<P> {
    pub fn new(inner: P, max_per_minute: u32, max_per_hour: u32) -> Self {
        Self {
            inner,
            max_per_minute,
            max_per_hour,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn admit(&self, count: usize) -> Result<(), TransportError> {
        self.admit_at(Instant::now(), count)
    }

    /// Reserve `count` slots at `now`, or reject without reserving any.
    fn admit_at(&self, now: Instant, count: usize) -> Result<(), TransportError> {
        for (max, window) in [(self.max_per_minute, "minute"), (self.max_per_hour, "hour")] {
            if max > 0 && count > max as usize {
                return Err(TransportError::ExceedsLimit {
                    requested: count,
                    max,
                    window,
                });
            }
        }

        let mut sent = self.sent.lock().unwrap_or_else(|err| err.into_inner());

        while sent
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= HOUR)
        {
            sent.pop_front();
        }

        let in_last_minute = sent
            .iter()
            .rev()
            .take_while(|at| now.saturating_duration_since(**at) < MINUTE)
            .count();

        for (max, used, window) in [
            (self.max_per_minute, in_last_minute, "minute"),
            (self.max_per_hour, sent.len(), "hour"),
        ] {
            if max > 0 && used + count > max as usize {
                warn!(
                    provider = self.inner.name(),
                    requested = count,
                    used,
                    max,
                    window,
                    "rate limit exceeded"
                );
                return Err(TransportError::RateLimited { max, window });
            }
        }

        if self.max_per_minute > 0 || self.max_per_hour > 0 {
            sent.extend(std::iter::repeat_n(now, count));
        }
        Ok(())
    }
}

impl<P: Provider> Provider for RateLimitedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send<'a>(
        &'a self,
        recipient: &'a str,
        message: &'a str,
    ) -> BoxFuture<'a, Result<Outcome, TransportError>> {
        Box::pin(async move {
            self.admit(1)?;
            self.inner.send(recipient, message).await
        })
    }

    fn send_bulk<'a>(
        &'a self,
        recipients: &'a [String],
        message: &'a str,
    ) -> BoxFuture<'a, Result<BulkOutcome, TransportError>> {
        Box::pin(async move {
            self.admit(recipients.len())?;
            self.inner.send_bulk(recipients, message).await
        })
    }
}
