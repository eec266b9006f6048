// src/services/ticket_iterator.rs
//! Listing the tickets an identity has issued.

use crate::errors::{Result, TicketError};
use crate::models::identity::IdentityPrivateKey;
use crate::models::record::RecordType;
use crate::models::ticket::Ticket;
use crate::services::lifecycle::Services;
use crate::storage::namestore::ZoneIterator;
use log::warn;
use std::collections::VecDeque;
use std::sync::Arc;

enum IterState {
    NotStarted,
    Running(Box<dyn ZoneIterator>),
    Finished,
}

/// Pull-based cursor over the TICKET records of an issuer's zone.
///
/// Each call to [`next`](TicketIterator::next) yields `Ok(Some(ticket))` for
/// one ticket, then `Ok(None)` once every ticket was visited. An error is
/// terminal: after `Err(_)` the iterator only returns `Ok(None)`.
pub struct TicketIterator {
    services: Arc<Services>,
    identity: IdentityPrivateKey,
    state: IterState,
    buffered: VecDeque<Ticket>,
}

impl TicketIterator {
    pub(crate) fn new(services: Arc<Services>, identity: IdentityPrivateKey) -> Self {
        TicketIterator {
            services,
            identity,
            state: IterState::NotStarted,
            buffered: VecDeque::new(),
        }
    }

    /// Advances to the next ticket.
    pub async fn next(&mut self) -> Result<Option<Ticket>> {
        if let IterState::NotStarted = self.state {
            let started = self
                .services
                .namestore
                .zone_iteration_start(&self.identity)
                .await;
            match started {
                Ok(zone_iter) => self.state = IterState::Running(zone_iter),
                Err(e) => {
                    self.state = IterState::Finished;
                    return Err(TicketError::lookup(e));
                }
            }
        }
        loop {
            if let Some(ticket) = self.buffered.pop_front() {
                return Ok(Some(ticket));
            }
            let zone_iter = match &mut self.state {
                IterState::Running(zone_iter) => zone_iter,
                _ => return Ok(None),
            };
            let visited = zone_iter.next().await;
            match visited {
                None => {
                    self.state = IterState::Finished;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.state = IterState::Finished;
                    return Err(TicketError::lookup(e));
                }
                Some(Ok(entry)) => {
                    for record in entry.records.iter().filter(|r| r.record_type == RecordType::Ticket) {
                        match Ticket::from_record_data(&record.data) {
                            Ok(ticket) => self.buffered.push_back(ticket),
                            Err(e) => warn!("Skipping unreadable ticket under {}: {}", entry.label, e),
                        }
                    }
                }
            }
        }
    }

    /// Stops the iteration early.
    pub fn stop(mut self) {
        if let IterState::Running(zone_iter) = std::mem::replace(&mut self.state, IterState::Finished) {
            zone_iter.stop();
        }
    }

    /// Drains the iterator into a list.
    pub async fn collect(mut self) -> Result<Vec<Ticket>> {
        let mut tickets = Vec::new();
        while let Some(ticket) = self.next().await? {
            tickets.push(ticket);
        }
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReclaimConfig;
    use crate::models::record::{Expiration, Record};
    use crate::storage::namestore::Namestore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_only_ticket_records_are_listed() {
        let (services, namestore, _) = Services::in_memory(ReclaimConfig::default());
        let issuer = IdentityPrivateKey::generate();
        let ticket = Ticket::new(issuer.public_key(), IdentityPrivateKey::generate().public_key());
        let ttl = Expiration::Relative(Duration::from_secs(60));
        namestore
            .store(
                &issuer,
                &ticket.label(),
                vec![Record::new(RecordType::Ticket, ticket.to_record_data().unwrap(), ttl).private()],
            )
            .await
            .unwrap();
        namestore
            .store(&issuer, "attribute", vec![Record::new(RecordType::Attribute, b"{}".to_vec(), ttl)])
            .await
            .unwrap();

        let mut iter = TicketIterator::new(services, issuer);
        assert_eq!(iter.next().await.unwrap(), Some(ticket));
        assert_eq!(iter.next().await.unwrap(), None);
        assert_eq!(iter.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let (services, namestore, _) = Services::in_memory(ReclaimConfig::default());
        namestore.fail_iterations(true);
        let mut iter = TicketIterator::new(services, IdentityPrivateKey::generate());
        assert!(matches!(iter.next().await, Err(TicketError::LookupFailure(_))));
        assert_eq!(iter.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_zone() {
        let (services, _, _) = Services::in_memory(ReclaimConfig::default());
        let iter = TicketIterator::new(services, IdentityPrivateKey::generate());
        assert!(iter.collect().await.unwrap().is_empty());
    }
}
