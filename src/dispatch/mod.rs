//! Dispatch layer: sends through the bound provider and records every attempt.

mod builder;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::{ConfigError, SmsConfig};
use crate::domain::{
    BulkOutcome, ErrorDescriptor, NewSentMessage, Outcome, SentMessage, ValidationError,
};
use crate::provider::{Provider, ProviderRegistry, TransportError};
use crate::store::{MessageStore, StoreError};

pub use builder::{MessageBuilder, Recipients};

/// Reason stored for a recipient a provider returned no per-recipient outcome for.
const NO_OUTCOME: &str = "no outcome reported";

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`DispatchService`] and [`MessageBuilder`].
pub enum DispatchError {
    /// The request was rejected before reaching the provider; nothing was recorded.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The provider could not be reached; `failed` records were written first.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A delivery record could not be written.
    #[error("failed to record delivery: {0}")]
    Storage(#[from] StoreError),
}

#[derive(Clone)]
/// Sends messages through one provider and writes one [`SentMessage`] per recipient.
///
/// Provider rejections come back as `failed` records. Transport failures are recorded first and
/// then returned as [`DispatchError::Transport`].
pub struct DispatchService {
    provider: Arc<dyn Provider>,
    store: Arc<dyn MessageStore>,
    default_sender: Option<String>,
    log_attempts: bool,
}

impl DispatchService {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            provider,
            store,
            default_sender: None,
            log_attempts: false,
        }
    }

    /// Sender recorded when a call does not pass one.
    pub fn with_default_sender(mut self, sender: impl Into<String>) -> Self {
        let sender = sender.into();
        self.default_sender = (!sender.trim().is_empty()).then_some(sender);
        self
    }

    /// Emit one `tracing` event per attempt.
    pub fn with_attempt_logging(mut self, enabled: bool) -> Self {
        self.log_attempts = enabled;
        self
    }

    /// Bind the configured provider (with its decorators) and apply the service settings.
    pub fn from_config(
        config: &SmsConfig,
        registry: &ProviderRegistry,
        store: Arc<dyn MessageStore>,
    ) -> Result<Self, ConfigError> {
        let provider = registry.resolve(config)?;
        Ok(Self::new(provider, store)
            .with_default_sender(&config.default_sender)
            .with_attempt_logging(config.logging.enabled))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Start a fluent request against this service.
    pub fn builder(&self) -> MessageBuilder<'_> {
        MessageBuilder::new(self)
    }

    /// Send one message and record the attempt.
    ///
    /// Returns the stored record whether the gateway accepted or rejected the message.
    /// `recipient` is passed through and stored verbatim. `sender` (or the default) is recorded
    /// but not forwarded to the provider.
    pub async fn send(
        &self,
        recipient: &str,
        message: &str,
        sender: Option<&str>,
    ) -> Result<SentMessage, DispatchError> {
        let sender = self.resolve_sender(sender);
        let sent_at = Utc::now();

        match self.provider.send(recipient, message).await {
            Ok(outcome) => {
                self.log_outcome(recipient, message, &outcome);
                let record = self.record(recipient, message, &sender, &outcome, sent_at);
                Ok(self.store.insert(record).await?)
            }
            Err(err) => {
                self.log_transport_error(recipient, message, &err);
                let outcome = transport_failure(&err);
                let record = self.record(recipient, message, &sender, &outcome, sent_at);
                self.store.insert(record).await?;
                Err(err.into())
            }
        }
    }

    /// Send one message to many recipients with a single provider call.
    ///
    /// Writes one record per recipient in submission order. An empty recipient list returns
    /// an empty vector without contacting the provider.
    pub async fn send_bulk(
        &self,
        recipients: &[String],
        message: &str,
        sender: Option<&str>,
    ) -> Result<Vec<SentMessage>, DispatchError> {
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let sender = self.resolve_sender(sender);
        let sent_at = Utc::now();

        let records = match self.provider.send_bulk(recipients, message).await {
            Ok(BulkOutcome::Batch(outcome)) => recipients
                .iter()
                .map(|recipient| {
                    self.log_outcome(recipient, message, &outcome);
                    self.record(recipient, message, &sender, &outcome, sent_at)
                })
                .collect::<Vec<_>>(),
            Ok(BulkOutcome::PerRecipient(outcomes)) => {
                if outcomes.len() > recipients.len() {
                    warn!(
                        provider = self.provider.name(),
                        recipients = recipients.len(),
                        outcomes = outcomes.len(),
                        "provider reported more outcomes than recipients; ignoring the surplus"
                    );
                }
                let mut outcomes = outcomes.into_iter();
                recipients
                    .iter()
                    .map(|recipient| {
                        let outcome = outcomes.next().unwrap_or_else(missing_outcome);
                        self.log_outcome(recipient, message, &outcome);
                        self.record(recipient, message, &sender, &outcome, sent_at)
                    })
                    .collect()
            }
            Err(err) => {
                let outcome = transport_failure(&err);
                let records = recipients
                    .iter()
                    .map(|recipient| {
                        self.log_transport_error(recipient, message, &err);
                        self.record(recipient, message, &sender, &outcome, sent_at)
                    })
                    .collect();
                self.persist_all(records).await?;
                return Err(err.into());
            }
        };

        Ok(self.persist_all(records).await?)
    }

    /// Insert every record, continuing past failed inserts; returns the first store error.
    async fn persist_all(
        &self,
        records: Vec<NewSentMessage>,
    ) -> Result<Vec<SentMessage>, StoreError> {
        let mut stored = Vec::with_capacity(records.len());
        let mut first_error = None;

        for record in records {
            match self.store.insert(record).await {
                Ok(record) => stored.push(record),
                Err(err) => {
                    error!(
                        provider = self.provider.name(),
                        error = %err,
                        "failed to record delivery"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(stored),
        }
    }

    fn resolve_sender(&self, sender: Option<&str>) -> Option<String> {
        sender
            .map(str::trim)
            .filter(|sender| !sender.is_empty())
            .map(str::to_owned)
            .or_else(|| self.default_sender.clone())
    }

    fn record(
        &self,
        recipient: &str,
        message: &str,
        sender: &Option<String>,
        outcome: &Outcome,
        sent_at: DateTime<Utc>,
    ) -> NewSentMessage {
        NewSentMessage {
            recipient: recipient.to_owned(),
            message: message.to_owned(),
            sender: sender.clone(),
            status: outcome.status.into(),
            provider: self.provider.name().to_owned(),
            provider_message_id: outcome.external_id.clone(),
            provider_response: outcome.response_payload(),
            sent_at,
        }
    }

    fn log_outcome(&self, recipient: &str, message: &str, outcome: &Outcome) {
        if !self.log_attempts {
            return;
        }
        if outcome.is_sent() {
            info!(
                provider = self.provider.name(),
                recipient,
                body = message,
                external_id = outcome.external_id.as_deref(),
                response = %outcome.raw_response,
                "sms sent"
            );
        } else {
            warn!(
                provider = self.provider.name(),
                recipient,
                body = message,
                error = outcome.error.as_deref(),
                response = %outcome.raw_response,
                "sms rejected by gateway"
            );
        }
    }

    fn log_transport_error(&self, recipient: &str, message: &str, err: &TransportError) {
        if !self.log_attempts {
            return;
        }
        error!(
            provider = self.provider.name(),
            recipient,
            body = message,
            code = err.code(),
            error = %err,
            "sms send failed"
        );
    }
}

fn transport_failure(err: &TransportError) -> Outcome {
    Outcome::failed(err.to_string(), err.descriptor().into_value())
}

fn missing_outcome() -> Outcome {
    Outcome::failed(NO_OUTCOME, ErrorDescriptor::new(NO_OUTCOME, 0).into_value())
}

impl std::fmt::Debug for DispatchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchService")
            .field("provider", &self.provider.name())
            .field("default_sender", &self.default_sender)
            .field("log_attempts", &self.log_attempts)
            .finish_non_exhaustive()
    }
}
