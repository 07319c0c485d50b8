use std::sync::Mutex;

use chrono::Utc;

use crate::BoxFuture;
use crate::domain::{MessageQuery, NewSentMessage, SentMessage};
use crate::store::{MessageStore, StoreError};

/// Process-local store for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<SentMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record in insertion order.
    pub fn records(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SentMessage>> {
        self.records.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl MessageStore for MemoryStore {
    fn insert<'a>(
        &'a self,
        record: NewSentMessage,
    ) -> BoxFuture<'a, Result<SentMessage, StoreError>> {
        let stored = {
            let mut records = self.lock();
            let id = records.last().map_or(1, |last| last.id + 1);
            let stored = record.into_record(id, Utc::now());
            records.push(stored.clone());
            stored
        };
        Box::pin(async move { Ok(stored) })
    }

    fn get<'a>(&'a self, id: i64) -> BoxFuture<'a, Result<Option<SentMessage>, StoreError>> {
        let found = self.lock().iter().find(|record| record.id == id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn list<'a>(
        &'a self,
        query: MessageQuery,
    ) -> BoxFuture<'a, Result<Vec<SentMessage>, StoreError>> {
        let found = self
            .lock()
            .iter()
            .rev()
            .filter(|record| query.matches(record))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Box::pin(async move { Ok(found) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::DeliveryStatus;

    fn attempt(recipient: &str, status: DeliveryStatus) -> NewSentMessage {
        NewSentMessage {
            recipient: recipient.to_owned(),
            message: "hi".to_owned(),
            sender: Some("Acme".to_owned()),
            status,
            provider: "http".to_owned(),
            provider_message_id: None,
            provider_response: json!({"status": "sent"}),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let first = store
            .insert(attempt("+9779801002468", DeliveryStatus::Sent))
            .await
            .unwrap();
        let second = store
            .insert(attempt("+9779812345678", DeliveryStatus::Failed))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).await.unwrap(), Some(second));
        assert_eq!(store.get(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_newest_first() {
        let store = MemoryStore::new();
        for (recipient, status) in [
            ("+9779801002468", DeliveryStatus::Sent),
            ("+9779812345678", DeliveryStatus::Failed),
            ("+9779801002468", DeliveryStatus::Failed),
        ] {
            store.insert(attempt(recipient, status)).await.unwrap();
        }

        let failed = store
            .list(MessageQuery::default().status(DeliveryStatus::Failed))
            .await
            .unwrap();
        assert_eq!(
            failed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![3, 2]
        );

        let latest = store
            .list(MessageQuery::default().recipient("+9779801002468").limit(1))
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, 3);
    }
}
