//! Outbound SMS dispatch engine.
//!
//! A [`DispatchService`] sends messages through one [`Provider`] (a gateway adapter, optionally
//! wrapped in retry and rate-limit decorators) and writes one [`SentMessage`] per recipient to a
//! [`MessageStore`], including attempts that failed before the gateway answered.
//!
//! The crate is layered: a domain layer of strong types and records, a transport layer for the
//! gateways' wire formats, providers that speak HTTP, and the dispatch layer on top.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use smsgate::{DispatchService, ProviderRegistry, SqliteStore, load_config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config()?;
//!     let store = SqliteStore::open(&config.storage.database_path).await?;
//!     let service =
//!         DispatchService::from_config(&config, &ProviderRegistry::new(), Arc::new(store))?;
//!
//!     let record = service
//!         .send("+9779801002468", "Your OTP is 4821", None)
//!         .await?;
//!     println!("{} -> {}", record.recipient, record.status);
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod provider;
pub mod store;
mod transport;

/// Boxed `Send` future returned by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use config::{ConfigError, SmsConfig, load_config, load_config_from_path};
pub use dispatch::{DispatchError, DispatchService, MessageBuilder, Recipients};
pub use domain::{
    BulkOutcome, DeliveryStatus, DeliverySummary, MessageQuery, MessageText, NewSentMessage,
    Outcome, OutcomeStatus, Recipient, RecipientRule, SenderId, SentMessage, ValidationError,
};
pub use provider::{
    BatchGatewayProvider, BulkMode, HttpGatewayProvider, Provider, ProviderRegistry,
    RateLimitedProvider, RetryingProvider, TransportError,
};
pub use store::{MemoryStore, MessageStore, SqliteStore, StoreError};
