// src/storage/resolver.rs
//! Name resolution ("GNS") contract.

use crate::models::identity::IdentityPublicKey;
use crate::models::record::{Record, TypeFilter};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Resolution failed for {label}: {reason}")]
    Failed { label: String, reason: String },

    #[error("Resolver disconnected")]
    Disconnected,
}

/// Public resolution of record sets by (zone public key, label).
///
/// Resolution only ever returns records that are not private and not
/// expired. A label with nothing to return resolves to an empty list.
/// Cancelling a lookup is done by dropping its future.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup(
        &self,
        zone: &IdentityPublicKey,
        label: &str,
        filter: TypeFilter,
    ) -> Result<Vec<Record>, ResolverError>;

    /// Releases the connection to the resolver.
    async fn disconnect(&self) {}
}
