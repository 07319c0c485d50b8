use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Lifecycle state of a persisted delivery record.
///
/// The dispatch path only ever writes [`DeliveryStatus::Sent`] or [`DeliveryStatus::Failed`];
/// `Pending` and `Delivered` are reserved for status updates arriving later.
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
}

impl DeliveryStatus {
    /// Stable lowercase name, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
        }
    }

    /// Parse the stored lowercase name.
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "pending" => Self::Pending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "delivered" => Self::Delivered,
            _ => return None,
        })
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Result state a provider can report for one attempt.
pub enum OutcomeStatus {
    Sent,
    Failed,
}

impl From<OutcomeStatus> for DeliveryStatus {
    fn from(value: OutcomeStatus) -> Self {
        match value {
            OutcomeStatus::Sent => DeliveryStatus::Sent,
            OutcomeStatus::Failed => DeliveryStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Normalized result of one provider call.
pub struct Outcome {
    /// Gateway-assigned message id (or batch id for batch sends).
    pub external_id: Option<String>,
    pub status: OutcomeStatus,
    /// Gateway response body, kept verbatim for audit.
    pub raw_response: Value,
    /// Human readable failure reason when `status` is `Failed`.
    pub error: Option<String>,
}

impl Outcome {
    pub fn sent(external_id: Option<String>, raw_response: Value) -> Self {
        Self {
            external_id,
            status: OutcomeStatus::Sent,
            raw_response,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, raw_response: Value) -> Self {
        Self {
            external_id: None,
            status: OutcomeStatus::Failed,
            raw_response,
            error: Some(error.into()),
        }
    }

    /// Attach an external id (used by batch adapters that report the batch id on failure too).
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn is_sent(&self) -> bool {
        self.status == OutcomeStatus::Sent
    }

    /// Payload persisted as `provider_response`.
    ///
    /// Never `null`: a missing gateway body is replaced by a minimal descriptor so that a
    /// `failed` record always carries an error and a `sent` record always carries a response.
    pub fn response_payload(&self) -> Value {
        if !self.raw_response.is_null() {
            return self.raw_response.clone();
        }
        match self.status {
            OutcomeStatus::Sent => json!({
                "status": DeliveryStatus::Sent.as_str(),
                "external_id": self.external_id,
            }),
            OutcomeStatus::Failed => ErrorDescriptor::new(
                self.error.as_deref().unwrap_or("unknown error"),
                0,
            )
            .into_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Result of a provider's bulk operation.
pub enum BulkOutcome {
    /// One aggregate result shared by every recipient in the batch.
    Batch(Outcome),
    /// One result per recipient, in the order the recipients were submitted.
    PerRecipient(Vec<Outcome>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// `{error, code}` payload stored when an attempt produced no gateway response.
pub struct ErrorDescriptor {
    pub error: String,
    pub code: i64,
}

impl ErrorDescriptor {
    pub fn new(error: impl Into<String>, code: i64) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }

    pub fn into_value(self) -> Value {
        json!({ "error": self.error, "code": self.code })
    }
}
