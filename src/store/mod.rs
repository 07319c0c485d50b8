//! Delivery record store: the durable log of every attempt, one row per recipient.

mod memory;
mod sqlite;

use std::error::Error as StdError;
use std::sync::Arc;

use crate::BoxFuture;
use crate::domain::{MessageQuery, NewSentMessage, SentMessage};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
/// Errors raised while writing or reading delivery records.
pub enum StoreError {
    /// The backing database failed.
    #[error("storage error: {0}")]
    Database(#[source] Box<dyn StdError + Send + Sync>),

    /// A provider response could not be encoded or decoded as JSON.
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row holds a value outside its domain.
    #[error("record {id} is corrupt: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Append-mostly log of delivery attempts.
///
/// `insert` assigns the id and the `created_at`/`updated_at` timestamps. `list` returns records
/// newest first.
pub trait MessageStore: Send + Sync {
    fn insert<'a>(
        &'a self,
        record: NewSentMessage,
    ) -> BoxFuture<'a, Result<SentMessage, StoreError>>;

    fn get<'a>(&'a self, id: i64) -> BoxFuture<'a, Result<Option<SentMessage>, StoreError>>;

    fn list<'a>(
        &'a self,
        query: MessageQuery,
    ) -> BoxFuture<'a, Result<Vec<SentMessage>, StoreError>>;
}

impl<S: MessageStore + ?Sized> MessageStore for Arc<S> {
    fn insert<'a>(
        &'a self,
        record: NewSentMessage,
    ) -> BoxFuture<'a, Result<SentMessage, StoreError>> {
        (**self).insert(record)
    }

    fn get<'a>(&'a self, id: i64) -> BoxFuture<'a, Result<Option<SentMessage>, StoreError>> {
        (**self).get(id)
    }

    fn list<'a>(
        &'a self,
        query: MessageQuery,
    ) -> BoxFuture<'a, Result<Vec<SentMessage>, StoreError>> {
        (**self).list(query)
    }
}
