//! SQLite-backed delivery log.
//!
//! All statements run on tokio-rusqlite's single background thread. Timestamps are stored as
//! RFC 3339 text and provider responses as JSON text.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;

use crate::BoxFuture;
use crate::domain::{DeliveryStatus, MessageQuery, NewSentMessage, SentMessage};
use crate::store::{MessageStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sent_messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    message TEXT NOT NULL,
    sender TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    provider TEXT NOT NULL,
    provider_message_id TEXT,
    provider_response TEXT NOT NULL,
    sent_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sent_messages_status ON sent_messages (status);
CREATE INDEX IF NOT EXISTS idx_sent_messages_recipient ON sent_messages (recipient);
";

const COLUMNS: &str = "id, recipient, message, sender, status, provider, provider_message_id, \
                       provider_response, sent_at, created_at, updated_at";

fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StoreError {
    StoreError::Database(Box::new(e))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Persistent store for delivery records backed by SQLite.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Database(Box::new(e)))?;
        Self::from_connection(Arc::new(conn)).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Database(Box::new(e)))?;
        Self::from_connection(Arc::new(conn)).await
    }

    /// Use an existing connection, creating the table if it is missing.
    pub async fn from_connection(conn: Arc<Connection>) -> Result<Self, StoreError> {
        conn.call(|conn| conn.execute_batch(SCHEMA))
            .await
            .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    async fn insert_record(&self, record: NewSentMessage) -> Result<SentMessage, StoreError> {
        let now = Utc::now();
        let response = serde_json::to_string(&record.provider_response)?;
        let row = (
            record.recipient.clone(),
            record.message.clone(),
            record.sender.clone(),
            record.status.as_str(),
            record.provider.clone(),
            record.provider_message_id.clone(),
            response,
            timestamp(&record.sent_at),
            timestamp(&now),
        );

        let id = self
            .conn
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO sent_messages (recipient, message, sender, status, provider, \
                     provider_message_id, provider_response, sent_at, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)?;

        Ok(record.into_record(id, now))
    }

    async fn get_record(&self, id: i64) -> Result<Option<SentMessage>, StoreError> {
        let row = self
            .conn
            .call(move |conn| -> Result<Option<MessageRow>, rusqlite::Error> {
                conn.query_row(
                    &format!("SELECT {COLUMNS} FROM sent_messages WHERE id = ?1"),
                    params![id],
                    MessageRow::from_row,
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)?;

        row.map(SentMessage::try_from).transpose()
    }

    async fn list_records(&self, query: MessageQuery) -> Result<Vec<SentMessage>, StoreError> {
        let status = query.status.map(DeliveryStatus::as_str);
        let recipient = query.recipient;
        let limit = query
            .limit
            .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<MessageRow>, rusqlite::Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM sent_messages \
                     WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR recipient = ?2) \
                     ORDER BY id DESC LIMIT ?3"
                ))?;
                let rows = stmt
                    .query_map(params![status, recipient, limit], MessageRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        rows.into_iter().map(SentMessage::try_from).collect()
    }
}

impl MessageStore for SqliteStore {
    fn insert<'a>(
        &'a self,
        record: NewSentMessage,
    ) -> BoxFuture<'a, Result<SentMessage, StoreError>> {
        Box::pin(self.insert_record(record))
    }

    fn get<'a>(&'a self, id: i64) -> BoxFuture<'a, Result<Option<SentMessage>, StoreError>> {
        Box::pin(self.get_record(id))
    }

    fn list<'a>(
        &'a self,
        query: MessageQuery,
    ) -> BoxFuture<'a, Result<Vec<SentMessage>, StoreError>> {
        Box::pin(self.list_records(query))
    }
}

/// Raw column values, decoded outside the database thread.
struct MessageRow {
    id: i64,
    recipient: String,
    message: String,
    sender: Option<String>,
    status: String,
    provider: String,
    provider_message_id: Option<String>,
    provider_response: String,
    sent_at: String,
    created_at: String,
    updated_at: String,
}

impl MessageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            recipient: row.get(1)?,
            message: row.get(2)?,
            sender: row.get(3)?,
            status: row.get(4)?,
            provider: row.get(5)?,
            provider_message_id: row.get(6)?,
            provider_response: row.get(7)?,
            sent_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<MessageRow> for SentMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let parse_time = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|err| StoreError::Corrupt {
                    id,
                    reason: format!("bad timestamp `{value}`: {err}"),
                })
        };

        Ok(Self {
            id,
            status: DeliveryStatus::parse(&row.status).ok_or_else(|| StoreError::Corrupt {
                id,
                reason: format!("unknown status `{}`", row.status),
            })?,
            provider_response: serde_json::from_str(&row.provider_response)?,
            sent_at: parse_time(&row.sent_at)?,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
            recipient: row.recipient,
            message: row.message,
            sender: row.sender,
            provider: row.provider,
            provider_message_id: row.provider_message_id,
        })
    }
}
