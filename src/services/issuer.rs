// src/services/issuer.rs
//! Ticket issuance.
//!
//! Issuing first scans the issuer's zone for a ticket that already grants
//! exactly the requested attributes to the same audience, and returns it if
//! found. Otherwise a fresh ticket record set is built and written in a single
//! store call, so a ticket only becomes visible once it is complete.

use crate::errors::{Result, TicketError};
use crate::models::credential::{AttributeList, Presentation, PresentationList};
use crate::models::identifier::Identifier;
use crate::models::identity::{IdentityPrivateKey, IdentityPublicKey};
use crate::models::record::{Expiration, Record, RecordType};
use crate::models::ticket::Ticket;
use crate::services::lifecycle::Services;
use crate::storage::namestore::ZoneEntry;
use crate::storage::statistics::STAT_TICKETS_ISSUED;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of a successful issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueResult {
    pub ticket: Ticket,
    /// Presentations attached to the ticket's record set
    pub presentations: PresentationList,
}

enum IssueStage {
    /// Scanning the zone for an equivalent ticket
    FindExisting,
    /// Writing a freshly built record set
    Store {
        ticket: Ticket,
        records: Vec<Record>,
        presentations: PresentationList,
    },
    Done(IssueResult),
}

pub(crate) struct IssueOperation {
    services: Arc<Services>,
    identity: IdentityPrivateKey,
    attributes: AttributeList,
    presentations: PresentationList,
    audience: IdentityPublicKey,
}

impl IssueOperation {
    pub(crate) fn new(
        services: Arc<Services>,
        identity: IdentityPrivateKey,
        attributes: AttributeList,
        presentations: PresentationList,
        audience: IdentityPublicKey,
    ) -> Self {
        IssueOperation {
            services,
            identity,
            attributes,
            presentations,
            audience,
        }
    }

    pub(crate) async fn run(self) -> Result<IssueResult> {
        let mut stage = IssueStage::FindExisting;
        loop {
            stage = match stage {
                IssueStage::FindExisting => match self.find_existing().await? {
                    Some(existing) => {
                        debug!("Reusing ticket {} for {}", existing.ticket.rnd, self.audience);
                        IssueStage::Done(existing)
                    }
                    None => self.build_new()?,
                },
                IssueStage::Store {
                    ticket,
                    records,
                    presentations,
                } => {
                    self.services
                        .namestore
                        .store(&self.identity, &ticket.label(), records)
                        .await
                        .map_err(TicketError::store)?;
                    self.services.statistics.update(STAT_TICKETS_ISSUED, 1);
                    info!("Issued ticket {} to {}", ticket.rnd, self.audience);
                    IssueStage::Done(IssueResult {
                        ticket,
                        presentations,
                    })
                }
                IssueStage::Done(result) => return Ok(result),
            };
        }
    }

    /// Walks the whole zone looking for an equivalent ticket.
    async fn find_existing(&self) -> Result<Option<IssueResult>> {
        let wanted_attributes = self.attributes.ids();
        let wanted_credentials = self.presented_credentials();
        let mut iter = self
            .services
            .namestore
            .zone_iteration_start(&self.identity)
            .await
            .map_err(TicketError::lookup)?;
        loop {
            let entry = match iter.next().await {
                Some(entry) => entry.map_err(TicketError::lookup)?,
                None => return Ok(None),
            };
            let candidate = match TicketCandidate::from_entry(&entry) {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping unreadable record set {}: {}", entry.label, e);
                    continue;
                }
            };
            if candidate.ticket.audience == self.audience
                && candidate.attribute_ids == wanted_attributes
                && candidate.credential_ids() == wanted_credentials
            {
                iter.stop();
                return Ok(Some(IssueResult {
                    ticket: candidate.ticket,
                    presentations: candidate.presentations,
                }));
            }
        }
    }

    /// Credential ids of the attributes that have a supplied presentation.
    ///
    /// These are exactly the PRESENTATION records a ticket for this request
    /// carries, so existing tickets are compared against this set.
    fn presented_credentials(&self) -> BTreeSet<Identifier> {
        self.attributes
            .credential_ids()
            .into_iter()
            .filter(|credential_id| self.presentations.find(credential_id).is_some())
            .collect()
    }

    /// Builds the record set of a new ticket.
    ///
    /// One ATTRIBUTE_REF per attribute, one PRESENTATION per distinct
    /// presented credential id, then the private TICKET record.
    fn build_new(&self) -> Result<IssueStage> {
        let ticket = Ticket::new(self.identity.public_key(), self.audience);
        let expiration = Expiration::Relative(self.services.config.ticket_refresh_interval);
        let mut records = Vec::with_capacity(self.attributes.len() + 1);
        let mut used = PresentationList::new();

        for attribute in self.attributes.iter() {
            records.push(Record::attribute_ref(&attribute.id, expiration));
            if attribute.is_credential_backed() && self.presentations.find(&attribute.credential_id).is_none() {
                warn!(
                    "No presentation supplied for credential {} of attribute {}",
                    attribute.credential_id, attribute.name
                );
            }
        }
        for credential_id in self.presented_credentials() {
            if let Some(presentation) = self.presentations.find(&credential_id) {
                records.push(Record::new(
                    RecordType::Presentation,
                    presentation.to_record_data()?,
                    expiration,
                ));
                used.push(presentation.clone());
            }
        }
        records.push(Record::new(RecordType::Ticket, ticket.to_record_data()?, expiration).private());

        Ok(IssueStage::Store {
            ticket,
            records,
            presentations: used,
        })
    }
}

/// A ticket reconstructed from a visited record set.
struct TicketCandidate {
    ticket: Ticket,
    attribute_ids: BTreeSet<Identifier>,
    presentations: PresentationList,
}

impl TicketCandidate {
    /// Returns `None` for record sets that hold no TICKET record.
    fn from_entry(entry: &ZoneEntry) -> Result<Option<Self>> {
        let mut ticket = None;
        let mut attribute_ids = BTreeSet::new();
        let mut presentations = PresentationList::new();
        for record in &entry.records {
            match record.record_type {
                RecordType::Ticket => ticket = Some(Ticket::from_record_data(&record.data)?),
                RecordType::AttributeRef => {
                    attribute_ids.insert(record.referenced_attribute()?);
                }
                RecordType::Presentation => {
                    presentations.push(Presentation::from_record_data(&record.data)?)
                }
                _ => {}
            }
        }
        Ok(ticket.map(|ticket| TicketCandidate {
            ticket,
            attribute_ids,
            presentations,
        }))
    }

    fn credential_ids(&self) -> BTreeSet<Identifier> {
        self.presentations.iter().map(|p| p.credential_id).collect()
    }
}
