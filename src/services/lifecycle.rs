// src/services/lifecycle.rs
//! Service lifecycle and the ticket service entry point.
//!
//! `Services` owns the process-wide collaborator handles (zone store,
//! resolver, metrics sink) and the configuration. It is built once at service
//! start and torn down with [`Services::shutdown`]; operations share it
//! through an `Arc` instead of opening their own connections.

use crate::config::ReclaimConfig;
use crate::models::credential::{AttributeList, PresentationList};
use crate::models::identity::{IdentityPrivateKey, IdentityPublicKey};
use crate::models::ticket::Ticket;
use crate::services::consumer::{ConsumeOperation, ConsumeResult};
use crate::services::handle::OperationHandle;
use crate::services::issuer::{IssueOperation, IssueResult};
use crate::services::revoker::RevokeOperation;
use crate::services::ticket_iterator::TicketIterator;
use crate::storage::memory::{MemoryNamestore, MemoryResolver};
use crate::storage::namestore::Namestore;
use crate::storage::resolver::Resolver;
use crate::storage::statistics::{MemoryStatistics, Statistics};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;

type ZoneLocks = Arc<Mutex<HashMap<IdentityPublicKey, Arc<tokio::sync::Mutex<()>>>>>;

/// Shared collaborator handles and configuration.
pub struct Services {
    pub namestore: Arc<dyn Namestore>,
    pub resolver: Arc<dyn Resolver>,
    pub statistics: Arc<dyn Statistics>,
    pub config: ReclaimConfig,
}

impl Services {
    /// Wires up the collaborators.
    ///
    /// # Arguments
    /// * `config` - Loaded configuration (refresh interval, consume timeout)
    /// * `namestore` - Connected zone store
    /// * `resolver` - Connected name resolver
    /// * `statistics` - Metrics sink
    pub fn new(
        config: ReclaimConfig,
        namestore: Arc<dyn Namestore>,
        resolver: Arc<dyn Resolver>,
        statistics: Arc<dyn Statistics>,
    ) -> Arc<Self> {
        info!(
            "Ticket services started (refresh interval {:?}, consume timeout {:?})",
            config.ticket_refresh_interval, config.consume_timeout
        );
        Arc::new(Services {
            namestore,
            resolver,
            statistics,
            config,
        })
    }

    /// Builds services backed by the in-memory zone store.
    ///
    /// Returns the store and statistics handles alongside, for inspection.
    pub fn in_memory(config: ReclaimConfig) -> (Arc<Self>, MemoryNamestore, MemoryStatistics) {
        let namestore = MemoryNamestore::new();
        let resolver = MemoryResolver::new(namestore.clone());
        let statistics = MemoryStatistics::new();
        let services = Services::new(
            config,
            Arc::new(namestore.clone()),
            Arc::new(resolver),
            Arc::new(statistics.clone()),
        );
        (services, namestore, statistics)
    }

    /// Disconnects from the zone store and resolver.
    pub async fn shutdown(&self) {
        self.namestore.disconnect().await;
        self.resolver.disconnect().await;
        info!("Ticket services stopped");
    }
}

/// Entry point for issuing, consuming, revoking and listing tickets.
///
/// Every operation runs as its own task and reports through an
/// [`OperationHandle`]. Operations only share the collaborator connections.
#[derive(Clone)]
pub struct TicketService {
    services: Arc<Services>,
    /// One lock per issuer zone with a revoke queued or running; revokes on
    /// the same zone run one at a time
    revoke_locks: ZoneLocks,
}

impl TicketService {
    pub fn new(services: Arc<Services>) -> Self {
        TicketService {
            services,
            revoke_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Issues a ticket granting `audience` access to `attributes`.
    ///
    /// If the issuer already holds a ticket for exactly these attributes and
    /// this audience, that ticket is returned instead of a new one.
    ///
    /// # Arguments
    /// * `identity` - Issuer's private key
    /// * `attributes` - Attributes to share
    /// * `presentations` - Presentations available for credential-backed attributes
    /// * `audience` - Identity the ticket is issued to
    pub fn issue(
        &self,
        identity: &IdentityPrivateKey,
        attributes: AttributeList,
        presentations: PresentationList,
        audience: IdentityPublicKey,
    ) -> OperationHandle<IssueResult> {
        let operation = IssueOperation::new(
            self.services.clone(),
            identity.clone(),
            attributes,
            presentations,
            audience,
        );
        OperationHandle::spawn(operation.run())
    }

    /// Resolves `ticket` into the attributes and presentations it grants.
    ///
    /// A ticket that resolves to nothing (never stored, expired or revoked)
    /// completes successfully with empty lists.
    pub fn consume(&self, audience: &IdentityPrivateKey, ticket: Ticket) -> OperationHandle<ConsumeResult> {
        let operation = ConsumeOperation::new(self.services.clone(), audience.clone(), ticket);
        OperationHandle::spawn(operation.run())
    }

    /// Revokes `ticket`, moving its attributes to fresh addresses and
    /// updating every other ticket that still references them.
    pub fn revoke(&self, identity: &IdentityPrivateKey, ticket: Ticket) -> OperationHandle<()> {
        let mut lease = self.lease_zone(identity.public_key());
        let operation = RevokeOperation::new(self.services.clone(), identity.clone(), ticket);
        OperationHandle::spawn(async move {
            lease.acquire().await;
            operation.run().await
        })
    }

    /// Starts listing the tickets issued by `identity`.
    pub fn iterate(&self, identity: &IdentityPrivateKey) -> TicketIterator {
        TicketIterator::new(self.services.clone(), identity.clone())
    }

    fn lease_zone(&self, zone: IdentityPublicKey) -> ZoneLease {
        let lock = lock_map(&self.revoke_locks).entry(zone).or_default().clone();
        ZoneLease {
            locks: self.revoke_locks.clone(),
            zone,
            lock: Some(lock),
            guard: None,
        }
    }
}

fn lock_map(locks: &ZoneLocks) -> MutexGuard<'_, HashMap<IdentityPublicKey, Arc<tokio::sync::Mutex<()>>>> {
    match locks.lock() {
        Ok(map) => map,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A queued or running revoke's claim on its zone lock.
///
/// Dropping the lease, on completion or cancellation, removes the zone's
/// entry once no other revoke holds it.
struct ZoneLease {
    locks: ZoneLocks,
    zone: IdentityPublicKey,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ZoneLease {
    async fn acquire(&mut self) {
        if let Some(lock) = self.lock.clone() {
            self.guard = Some(lock.lock_owned().await);
        }
    }
}

impl Drop for ZoneLease {
    fn drop(&mut self) {
        self.guard = None;
        self.lock = None;
        let mut map = lock_map(&self.locks);
        if map.get(&self.zone).map_or(false, |lock| Arc::strong_count(lock) == 1) {
            map.remove(&self.zone);
        }
    }
}
