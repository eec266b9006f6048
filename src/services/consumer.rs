// src/services/consumer.rs
//! Ticket consumption.
//!
//! The audience resolves the ticket label in the issuer's zone, then resolves
//! every referenced attribute label in parallel. A watchdog bounds the whole
//! operation; when it fires, every pending lookup is dropped and partial
//! results are discarded.

use crate::errors::{Result, TicketError};
use crate::models::credential::{Attribute, AttributeList, Presentation, PresentationList};
use crate::models::identifier::Identifier;
use crate::models::identity::{IdentityPrivateKey, IdentityPublicKey};
use crate::models::record::{Record, RecordType, TypeFilter};
use crate::models::ticket::Ticket;
use crate::services::lifecycle::Services;
use crate::storage::resolver::ResolverError;
use crate::storage::statistics::{STAT_ATTRIBUTE_LOOKUPS, STAT_ATTRIBUTE_LOOKUP_TIME_US};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// What a ticket resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeResult {
    /// The issuer's zone
    pub identity: IdentityPublicKey,
    pub attributes: AttributeList,
    pub presentations: PresentationList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumeStage {
    ResolveTicket,
    ResolveAttributes,
}

type LookupOutcome = (u64, std::result::Result<Vec<Record>, ResolverError>);

pub(crate) struct ConsumeOperation {
    services: Arc<Services>,
    audience: IdentityPrivateKey,
    ticket: Ticket,
    stage: ConsumeStage,
    /// In-flight attribute lookups, keyed by request id
    pending: BTreeMap<u64, Identifier>,
    next_request_id: u64,
    lookups: JoinSet<LookupOutcome>,
    attributes: AttributeList,
    presentations: PresentationList,
}

impl ConsumeOperation {
    pub(crate) fn new(services: Arc<Services>, audience: IdentityPrivateKey, ticket: Ticket) -> Self {
        ConsumeOperation {
            services,
            audience,
            ticket,
            stage: ConsumeStage::ResolveTicket,
            pending: BTreeMap::new(),
            next_request_id: 0,
            lookups: JoinSet::new(),
            attributes: AttributeList::new(),
            presentations: PresentationList::new(),
        }
    }

    pub(crate) async fn run(mut self) -> Result<ConsumeResult> {
        if self.audience.public_key() != self.ticket.audience {
            return Err(TicketError::AudienceMismatch);
        }
        let timeout = self.services.config.consume_timeout;
        let started = Instant::now();

        let resolved = tokio::time::timeout(timeout, self.resolve()).await;
        match resolved {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "Consume of ticket {} timed out in {:?} with {} lookups pending",
                    self.ticket.rnd,
                    self.stage,
                    self.pending.len()
                );
                // Dropping `self` aborts the remaining lookups
                return Err(TicketError::Timeout(timeout));
            }
        }

        let elapsed_us = i64::try_from(started.elapsed().as_micros()).unwrap_or(i64::MAX);
        self.services.statistics.update(STAT_ATTRIBUTE_LOOKUP_TIME_US, elapsed_us);
        self.services.statistics.update(STAT_ATTRIBUTE_LOOKUPS, 1);
        info!(
            "Consumed ticket {}: {} attributes, {} presentations",
            self.ticket.rnd,
            self.attributes.len(),
            self.presentations.len()
        );
        Ok(ConsumeResult {
            identity: self.ticket.identity,
            attributes: self.attributes,
            presentations: self.presentations,
        })
    }

    async fn resolve(&mut self) -> Result<()> {
        let records = self
            .services
            .resolver
            .lookup(
                &self.ticket.identity,
                &self.ticket.label(),
                TypeFilter::Only(vec![RecordType::AttributeRef, RecordType::Presentation]),
            )
            .await?;

        for record in records {
            match record.record_type {
                RecordType::Presentation => {
                    self.presentations.push(Presentation::from_record_data(&record.data)?)
                }
                RecordType::AttributeRef => {
                    let attribute_id = record.referenced_attribute()?;
                    self.launch_lookup(attribute_id);
                }
                _ => {}
            }
        }

        if self.pending.is_empty() {
            debug!("Ticket {} references no attributes", self.ticket.rnd);
            return Ok(());
        }

        self.stage = ConsumeStage::ResolveAttributes;
        while let Some(joined) = self.lookups.join_next().await {
            let (request_id, outcome) = joined.map_err(|e| TicketError::LookupFailure(e.to_string()))?;
            self.pending.remove(&request_id);
            for record in outcome? {
                if record.record_type == RecordType::Attribute {
                    self.attributes.push(Attribute::from_record_data(&record.data)?);
                }
            }
        }
        Ok(())
    }

    fn launch_lookup(&mut self, attribute_id: Identifier) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending.insert(request_id, attribute_id);

        let resolver = self.services.resolver.clone();
        let zone = self.ticket.identity;
        debug!("Resolving attribute {} (request {})", attribute_id, request_id);
        self.lookups.spawn(async move {
            let outcome = resolver
                .lookup(&zone, &attribute_id.to_label(), TypeFilter::Any)
                .await;
            (request_id, outcome)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReclaimConfig;
    use crate::models::record::Expiration;
    use crate::storage::namestore::Namestore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_audience_mismatch() {
        let (services, _, _) = Services::in_memory(ReclaimConfig::default());
        let issuer = IdentityPrivateKey::generate();
        let audience = IdentityPrivateKey::generate();
        let stranger = IdentityPrivateKey::generate();
        let ticket = Ticket::new(issuer.public_key(), audience.public_key());
        let result = ConsumeOperation::new(services, stranger, ticket).run().await;
        assert!(matches!(result, Err(TicketError::AudienceMismatch)));
    }

    #[tokio::test]
    async fn test_unknown_ticket_resolves_empty() {
        let (services, _, statistics) = Services::in_memory(ReclaimConfig::default());
        let issuer = IdentityPrivateKey::generate();
        let audience = IdentityPrivateKey::generate();
        let ticket = Ticket::new(issuer.public_key(), audience.public_key());
        let result = ConsumeOperation::new(services, audience, ticket).run().await.unwrap();
        assert!(result.attributes.is_empty());
        assert!(result.presentations.is_empty());
        assert_eq!(result.identity, issuer.public_key());
        assert_eq!(
            crate::storage::Statistics::get(&statistics, STAT_ATTRIBUTE_LOOKUPS),
            1
        );
    }

    #[tokio::test]
    async fn test_dangling_reference_resolves_to_nothing() {
        let (services, namestore, _) = Services::in_memory(ReclaimConfig::default());
        let issuer = IdentityPrivateKey::generate();
        let audience = IdentityPrivateKey::generate();
        let ticket = Ticket::new(issuer.public_key(), audience.public_key());
        let expiration = Expiration::Relative(Duration::from_secs(60));
        namestore
            .store(
                &issuer,
                &ticket.label(),
                vec![Record::attribute_ref(&Identifier::random(), expiration)],
            )
            .await
            .unwrap();
        let result = ConsumeOperation::new(services, audience, ticket).run().await.unwrap();
        assert!(result.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_attribute_aborts() {
        let (services, namestore, _) = Services::in_memory(ReclaimConfig::default());
        let issuer = IdentityPrivateKey::generate();
        let audience = IdentityPrivateKey::generate();
        let ticket = Ticket::new(issuer.public_key(), audience.public_key());
        let attribute_id = Identifier::random();
        let expiration = Expiration::Relative(Duration::from_secs(60));
        namestore
            .store(&issuer, &ticket.label(), vec![Record::attribute_ref(&attribute_id, expiration)])
            .await
            .unwrap();
        namestore
            .store(
                &issuer,
                &attribute_id.to_label(),
                vec![Record::new(RecordType::Attribute, b"{broken".to_vec(), expiration)],
            )
            .await
            .unwrap();
        let result = ConsumeOperation::new(services, audience, ticket).run().await;
        assert!(matches!(result, Err(TicketError::Serialization(_))));
    }
}
