// src/storage/namestore.rs
//! Zone store ("namestore") contract.
//!
//! Record sets are keyed by (zone private key, label). The store is the only
//! place ticket state lives; the ticket services hold nothing durable.

use crate::models::identity::IdentityPrivateKey;
use crate::models::record::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a zone store implementation.
#[derive(Debug, Error)]
pub enum NamestoreError {
    /// The store refused or failed a write
    #[error("Write rejected for label {label}: {reason}")]
    WriteRejected { label: String, reason: String },

    /// The store failed to read
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// The connection to the store is gone
    #[error("Namestore disconnected")]
    Disconnected,
}

/// A record set as visited during zone iteration.
#[derive(Debug, Clone)]
pub struct ZoneEntry {
    pub label: String,
    pub records: Vec<Record>,
}

/// Storage interface for zone record sets.
///
/// This trait abstracts the zone store so that the ticket services can run
/// against any backend, including the in-memory one used in tests.
#[async_trait]
pub trait Namestore: Send + Sync {
    /// Atomically replaces the record set at `label`.
    ///
    /// An empty `records` deletes the label.
    async fn store(
        &self,
        zone: &IdentityPrivateKey,
        label: &str,
        records: Vec<Record>,
    ) -> Result<(), NamestoreError>;

    /// Returns the record set at `label`.
    ///
    /// A label that was never stored (or was deleted) yields an empty set.
    async fn lookup(&self, zone: &IdentityPrivateKey, label: &str) -> Result<Vec<Record>, NamestoreError>;

    /// Starts iterating over every non-empty record set in the zone.
    async fn zone_iteration_start(
        &self,
        zone: &IdentityPrivateKey,
    ) -> Result<Box<dyn ZoneIterator>, NamestoreError>;

    /// Releases the connection to the store.
    async fn disconnect(&self) {}
}

/// Cursor over the record sets of a zone.
///
/// Iteration ends when `next` returns `None`. Dropping the iterator (or
/// calling `stop`) ends it early.
#[async_trait]
pub trait ZoneIterator: Send {
    /// Fetches the next record set.
    ///
    /// `Some(Err(_))` is terminal: the iterator yields nothing afterwards.
    async fn next(&mut self) -> Option<Result<ZoneEntry, NamestoreError>>;

    /// Stops the iteration before it finishes.
    fn stop(self: Box<Self>) {}
}
