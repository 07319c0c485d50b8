use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::outcome::DeliveryStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Durable record of one delivery attempt to one recipient.
///
/// This is the shape admin and audit tooling read back from the store.
pub struct SentMessage {
    pub id: i64,
    pub recipient: String,
    pub message: String,
    pub sender: Option<String>,
    pub status: DeliveryStatus,
    pub provider: String,
    pub provider_message_id: Option<String>,
    pub provider_response: Value,
    /// When the attempt happened; set for failed attempts too.
    pub sent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SentMessage {
    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }

    pub fn is_failed(&self) -> bool {
        self.status == DeliveryStatus::Failed
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A delivery record that has not been assigned an id yet.
pub struct NewSentMessage {
    pub recipient: String,
    pub message: String,
    pub sender: Option<String>,
    pub status: DeliveryStatus,
    pub provider: String,
    pub provider_message_id: Option<String>,
    pub provider_response: Value,
    pub sent_at: DateTime<Utc>,
}

impl NewSentMessage {
    /// Attach the store-assigned id and audit timestamps.
    pub fn into_record(self, id: i64, now: DateTime<Utc>) -> SentMessage {
        SentMessage {
            id,
            recipient: self.recipient,
            message: self.message,
            sender: self.sender,
            status: self.status,
            provider: self.provider,
            provider_message_id: self.provider_message_id,
            provider_response: self.provider_response,
            sent_at: self.sent_at,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Counts over a set of records, as reported back for bulk sends.
pub struct DeliverySummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl DeliverySummary {
    pub fn from_records(records: &[SentMessage]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            acc.total += 1;
            match record.status {
                DeliveryStatus::Sent | DeliveryStatus::Delivered => acc.successful += 1,
                DeliveryStatus::Failed => acc.failed += 1,
                DeliveryStatus::Pending => {}
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Filter for reading delivery history. Results are ordered newest first.
pub struct MessageQuery {
    pub status: Option<DeliveryStatus>,
    pub recipient: Option<String>,
    pub limit: Option<usize>,
}

impl MessageQuery {
    pub fn status(mut self, status: DeliveryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, record: &SentMessage) -> bool {
        self.status.is_none_or(|status| record.status == status)
            && self
                .recipient
                .as_deref()
                .is_none_or(|recipient| record.recipient == recipient)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(id: i64, status: DeliveryStatus) -> SentMessage {
        NewSentMessage {
            recipient: format!("+97798000000{id:02}"),
            message: "hi".to_owned(),
            sender: None,
            status,
            provider: "http".to_owned(),
            provider_message_id: None,
            provider_response: json!({}),
            sent_at: Utc::now(),
        }
        .into_record(id, Utc::now())
    }

    #[test]
    fn summary_counts_by_status() {
        let records = vec![
            record(1, DeliveryStatus::Sent),
            record(2, DeliveryStatus::Failed),
            record(3, DeliveryStatus::Sent),
        ];
        let summary = DeliverySummary::from_records(&records);
        assert_eq!(
            summary,
            DeliverySummary {
                total: 3,
                successful: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn query_matches_on_status_and_recipient() {
        let sent = record(1, DeliveryStatus::Sent);
        assert!(MessageQuery::default().matches(&sent));
        assert!(MessageQuery::default().status(DeliveryStatus::Sent).matches(&sent));
        assert!(!MessageQuery::default().status(DeliveryStatus::Failed).matches(&sent));
        assert!(
            MessageQuery::default()
                .recipient(sent.recipient.clone())
                .matches(&sent)
        );
        assert!(!MessageQuery::default().recipient("+1").matches(&sent));
    }
}
