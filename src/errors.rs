// src/errors.rs
//! Error types for the ticket lifecycle.
//!
//! Collaborator failures are folded into the two kinds callers care about:
//! the zone store refused a write (`StoreFailure`) or a store/resolver read
//! returned an error instead of data (`LookupFailure`).

use crate::storage::namestore::NamestoreError;
use crate::storage::resolver::ResolverError;
use thiserror::Error;

/// Errors reported by issue, consume, revoke and ticket iteration.
#[derive(Debug, Error)]
pub enum TicketError {
    /// The zone store rejected a write or delete
    #[error("Store failure: {0}")]
    StoreFailure(String),

    /// The zone store or resolver returned an error instead of data
    #[error("Lookup failure: {0}")]
    LookupFailure(String),

    /// An expected record set was absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The consume watchdog fired before all lookups finished
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// A record payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The ticket was not issued to the presenting identity
    #[error("Ticket audience does not match the consuming identity")]
    AudienceMismatch,

    /// Configuration value present but unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for TicketError {
    fn from(err: serde_json::Error) -> Self {
        TicketError::Serialization(err.to_string())
    }
}

impl From<ResolverError> for TicketError {
    fn from(err: ResolverError) -> Self {
        TicketError::LookupFailure(err.to_string())
    }
}

impl TicketError {
    /// Maps a namestore error raised by a write or delete.
    pub fn store(err: NamestoreError) -> Self {
        TicketError::StoreFailure(err.to_string())
    }

    /// Maps a namestore error raised by a lookup or zone iteration.
    pub fn lookup(err: NamestoreError) -> Self {
        TicketError::LookupFailure(err.to_string())
    }
}

/// Result type for ticket operations
pub type Result<T> = std::result::Result<T, TicketError>;
